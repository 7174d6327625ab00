//! HTTP request handler

use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use vex_core::response::responses;
use vex_core::{Body, Handler};

/// Bridges hyper connections to the service's [`Handler`].
///
/// Logs every request, collects its body under the configured size limit and
/// hands the buffered request on.
#[derive(Clone)]
pub struct RequestHandler {
    handler: Arc<dyn Handler>,
    max_body_size: usize,
    request_count: Arc<AtomicUsize>,
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("handler", &self.handler)
            .field("max_body_size", &self.max_body_size)
            .field("request_count", &self.request_count)
            .finish()
    }
}

impl RequestHandler {
    /// Create a new request handler
    pub fn new(handler: Arc<dyn Handler>, max_body_size: usize) -> Self {
        Self {
            handler,
            max_body_size,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Requests handled so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Handle an incoming HTTP request (from Hyper with Incoming body)
    pub async fn handle(&self, req: Request<Incoming>, remote: SocketAddr) -> Response<Body> {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        debug!(
            remote_addr = %remote,
            method = %req.method(),
            path = %req.uri().path(),
            "Handling request"
        );

        let (parts, body) = req.into_parts();

        let body = match Limited::new(body, self.max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                debug!(
                    remote_addr = %remote,
                    limit = self.max_body_size,
                    error = %err,
                    "Failed to read request body"
                );
                let policy = self.handler.header_policy(parts.uri.path());
                return responses::status(StatusCode::BAD_REQUEST, policy)
                    .unwrap_or_else(|_| responses::fallback(StatusCode::BAD_REQUEST));
            }
        };

        self.handler
            .call(Request::from_parts(parts, Full::new(body)))
            .await
    }
}
