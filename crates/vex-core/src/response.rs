//! Response builder and the service's header policy

use crate::{Error, Result};
use bytes::Bytes;
use http::{header, HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;

/// Body type alias
pub type Body = Full<Bytes>;

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Which header set an endpoint stamps on every response it produces.
///
/// Headers are attached while building, so they are always in place before
/// the status line goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum HeaderPolicy {
    /// `Content-Type`, `X-Content-Type-Options` and `Cache-Control`
    #[default]
    Plain,
    /// [`HeaderPolicy::Plain`] plus `X-Frame-Options` and `X-Xss-Protection`
    Framed,
}

impl HeaderPolicy {
    /// Stamp this policy's headers onto a builder
    pub fn apply(self, builder: ResponseBuilder) -> ResponseBuilder {
        let builder = builder
            .header(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)
            .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
            .header(header::CACHE_CONTROL, "no-store");

        match self {
            HeaderPolicy::Plain => builder,
            HeaderPolicy::Framed => builder
                .header(header::X_FRAME_OPTIONS, "deny")
                .header(header::X_XSS_PROTECTION, "1; mode=block"),
        }
    }

    /// The stricter of two policies
    pub fn merge(self, other: HeaderPolicy) -> HeaderPolicy {
        self.max(other)
    }

    /// Start a response with this policy applied
    pub fn respond(self, status: StatusCode) -> ResponseBuilder {
        self.apply(ResponseBuilder::new(status))
    }
}

/// Response builder for convenient response construction
#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(header::HeaderName, String)>,
}

impl ResponseBuilder {
    /// Create a new response builder
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// Set a header
    pub fn header(mut self, name: header::HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Set the `Location` header
    pub fn location(self, uri: impl Into<String>) -> Self {
        self.header(header::LOCATION, uri)
    }

    /// Set the `Allow` header from a method list
    pub fn allow(self, methods: &[Method]) -> Self {
        let value = methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        self.header(header::ALLOW, value)
    }

    /// Build response with empty body
    pub fn build(self) -> Result<Response<Body>> {
        self.finish(Bytes::new())
    }

    /// Build response with text body
    pub fn text(self, body: impl Into<String>) -> Result<Response<Body>> {
        self.finish(Bytes::from(body.into()))
    }

    fn finish(self, body: Bytes) -> Result<Response<Body>> {
        let mut response = Response::builder().status(self.status);

        for (name, value) in self.headers {
            response = response.header(name, value);
        }

        Ok(response.body(Full::new(body))?)
    }
}

/// Convenience functions for common responses
pub mod responses {
    use super::*;

    /// 200 OK with an empty body
    pub fn ok(policy: HeaderPolicy) -> Result<Response<Body>> {
        policy.respond(StatusCode::OK).build()
    }

    /// A status-only response whose body is the canonical reason phrase
    pub fn status(status: StatusCode, policy: HeaderPolicy) -> Result<Response<Body>> {
        policy
            .respond(status)
            .text(status.canonical_reason().unwrap_or_default())
    }

    /// Map an error to its response.
    ///
    /// Only the status and its reason phrase reach the client; the error's
    /// own message stays in the logs.
    pub fn from_error(err: &Error, policy: HeaderPolicy) -> Response<Body> {
        let status = err.to_status_code();
        let mut builder = policy.respond(status);

        if let Error::MethodNotAllowed { allowed, .. } = err {
            builder = builder.allow(allowed);
        }

        builder
            .text(status.canonical_reason().unwrap_or_default())
            .unwrap_or_else(|_| fallback(status))
    }

    /// Infallible last-resort response carrying the plain header set
    pub fn fallback(status: StatusCode) -> Response<Body> {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(TEXT_PLAIN_UTF8),
        );
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

        response
    }
}
