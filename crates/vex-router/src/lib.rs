//! # Vex Router
//!
//! Static request router:
//! - Exact path matching (no parameters, no wildcards)
//! - Optional method restriction per route (GET routes also answer HEAD)
//! - `405 Method Not Allowed` with an `Allow` header for known paths
//! - `404 Not Found` for everything else
//!
//! The table is filled once while the service is constructed and only read
//! afterwards.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod route;

pub use route::{Route, RouteBuilder};

use async_trait::async_trait;
use http::{Method, Request, Response};
use std::collections::HashMap;
use std::sync::Arc;
use vex_core::response::responses;
use vex_core::{Body, Error, Handler, HeaderPolicy, Result};

/// Router mapping `(method, path)` to exactly one handler
#[derive(Debug, Clone, Default)]
pub struct Router {
    /// Routes keyed by exact path
    routes: HashMap<String, Vec<Route>>,
}

impl Router {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route.
    ///
    /// Registering the same path twice for the same method (or twice for any
    /// method) is a configuration error.
    pub fn add_route(&mut self, route: Route) -> Result<()> {
        let routes = self.routes.entry(route.path.clone()).or_default();

        if routes.iter().any(|existing| existing.method == route.method) {
            return Err(Error::Config(format!(
                "duplicate route: {} {}",
                route.method.as_ref().map_or("*", Method::as_str),
                route.path
            )));
        }

        tracing::debug!(
            method = route.method.as_ref().map_or("*", Method::as_str),
            path = %route.path,
            "Route added to router"
        );

        routes.push(route);
        Ok(())
    }

    /// Match a request.
    ///
    /// A method-specific route wins over an any-method route on the same
    /// path.
    pub fn match_route(&self, method: &Method, path: &str) -> Result<&Route> {
        let routes = self
            .routes
            .get(path)
            .ok_or_else(|| Error::RouteNotFound(path.to_string()))?;

        routes
            .iter()
            .find(|r| r.method.is_some() && r.accepts(method))
            .or_else(|| routes.iter().find(|r| r.method.is_none()))
            .ok_or_else(|| Error::MethodNotAllowed {
                method: method.clone(),
                allowed: Self::allowed(routes),
            })
    }

    /// Strictest header policy registered on `path`
    pub fn policy_for(&self, path: &str) -> HeaderPolicy {
        self.routes
            .get(path)
            .map(|routes| {
                routes
                    .iter()
                    .fold(HeaderPolicy::Plain, |policy, r| policy.merge(r.headers))
            })
            .unwrap_or_default()
    }

    /// Get total route count
    pub fn route_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    fn allowed(routes: &[Route]) -> Vec<Method> {
        let mut allowed: Vec<Method> = Vec::new();
        for method in routes.iter().flat_map(Route::allowed_methods) {
            if !allowed.contains(&method) {
                allowed.push(method);
            }
        }
        allowed
    }
}

#[async_trait]
impl Handler for Router {
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        let matched = self
            .match_route(req.method(), req.uri().path())
            .map(|route| Arc::clone(&route.handler));

        match matched {
            Ok(handler) => handler.call(req).await,
            Err(err) => {
                tracing::debug!(
                    method = %req.method(),
                    path = %req.uri().path(),
                    error = %err,
                    "No route for request"
                );
                responses::from_error(&err, self.policy_for(req.uri().path()))
            }
        }
    }

    fn header_policy(&self, path: &str) -> HeaderPolicy {
        self.policy_for(path)
    }
}
