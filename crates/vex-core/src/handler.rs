//! Request handler trait

use crate::response::{Body, HeaderPolicy};
use async_trait::async_trait;
use http::{Request, Response};

/// An endpoint the router dispatches to.
///
/// Handlers absorb their own failures: whatever goes wrong inside a request
/// is turned into a status code here, so `call` always yields a response.
#[async_trait]
pub trait Handler: Send + Sync + std::fmt::Debug + 'static {
    /// Handle a request whose body has already been collected
    async fn call(&self, req: Request<Body>) -> Response<Body>;

    /// Headers for responses produced on `path` before the handler runs,
    /// such as a rejected request body
    fn header_policy(&self, _path: &str) -> HeaderPolicy {
        HeaderPolicy::Plain
    }
}
