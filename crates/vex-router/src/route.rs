//! Route definition and builder

use http::Method;
use std::sync::Arc;
use vex_core::{Error, Handler, HeaderPolicy, Result};

/// Route definition
#[derive(Debug, Clone)]
pub struct Route {
    /// HTTP method, or `None` to accept any method
    pub method: Option<Method>,

    /// Exact request path
    pub path: String,

    /// Headers stamped on responses the router produces for this path
    pub headers: HeaderPolicy,

    /// Endpoint handler
    pub handler: Arc<dyn Handler>,
}

impl Route {
    /// Create a new route builder
    pub fn builder() -> RouteBuilder {
        RouteBuilder::new()
    }

    /// Whether this route accepts `method`. A GET route also answers HEAD.
    pub fn accepts(&self, method: &Method) -> bool {
        match &self.method {
            None => true,
            Some(m) if m == method => true,
            Some(m) => *m == Method::GET && *method == Method::HEAD,
        }
    }

    /// Methods this route answers, for `Allow` headers
    pub fn allowed_methods(&self) -> Vec<Method> {
        match &self.method {
            Some(m) if *m == Method::GET => vec![Method::GET, Method::HEAD],
            Some(m) => vec![m.clone()],
            None => Vec::new(),
        }
    }
}

/// Builder for constructing routes
#[derive(Debug, Default)]
pub struct RouteBuilder {
    method: Option<Method>,
    path: Option<String>,
    headers: HeaderPolicy,
    handler: Option<Arc<dyn Handler>>,
}

impl RouteBuilder {
    /// Create a new route builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the route to one HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the header policy
    pub fn headers(mut self, policy: HeaderPolicy) -> Self {
        self.headers = policy;
        self
    }

    /// Set the handler
    pub fn handler(self, handler: impl Handler) -> Self {
        self.shared_handler(Arc::new(handler))
    }

    /// Set a handler shared with other routes
    pub fn shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Build the route
    pub fn build(self) -> Result<Route> {
        let path = self
            .path
            .ok_or_else(|| Error::Config("path is required".to_string()))?;

        let handler = self
            .handler
            .ok_or_else(|| Error::Config("handler is required".to_string()))?;

        if !path.starts_with('/') {
            return Err(Error::Config("path must start with '/'".to_string()));
        }

        Ok(Route {
            method: self.method,
            path,
            headers: self.headers,
            handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http::{Request, Response};
    use vex_core::Body;

    #[derive(Debug)]
    struct Nothing;

    #[async_trait]
    impl Handler for Nothing {
        async fn call(&self, _req: Request<Body>) -> Response<Body> {
            Response::new(Body::default())
        }
    }

    #[test]
    fn test_route_builder() {
        let route = RouteBuilder::new()
            .method(Method::POST)
            .path("/v1/queue/")
            .headers(HeaderPolicy::Framed)
            .handler(Nothing)
            .build()
            .unwrap();

        assert_eq!(route.method, Some(Method::POST));
        assert_eq!(route.path, "/v1/queue/");
        assert_eq!(route.headers, HeaderPolicy::Framed);
    }

    #[test]
    fn test_route_builder_missing_fields() {
        assert!(RouteBuilder::new().path("/healthz").build().is_err());
        assert!(RouteBuilder::new().handler(Nothing).build().is_err());
    }

    #[test]
    fn test_route_builder_invalid_path() {
        let result = RouteBuilder::new()
            .path("healthz") // Missing leading slash
            .handler(Nothing)
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_get_route_accepts_head() {
        let route = Route::builder()
            .method(Method::GET)
            .path("/healthz")
            .handler(Nothing)
            .build()
            .unwrap();

        assert!(route.accepts(&Method::GET));
        assert!(route.accepts(&Method::HEAD));
        assert!(!route.accepts(&Method::POST));
        assert_eq!(route.allowed_methods(), vec![Method::GET, Method::HEAD]);
    }

    #[test]
    fn test_any_method_route() {
        let route = Route::builder()
            .path("/anything")
            .handler(Nothing)
            .build()
            .unwrap();

        assert!(route.accepts(&Method::DELETE));
        assert!(route.allowed_methods().is_empty());
    }
}
