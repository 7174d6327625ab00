//! Service endpoints: liveness and readiness probes plus the submission queue

use async_trait::async_trait;
use http::{header, HeaderMap, Method, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, error};
use vex_core::response::responses;
use vex_core::{Body, Error, Handler, HeaderPolicy, Result};
use vex_queue::{Submission, SubmissionQueue};
use vex_router::{Route, Router};

/// Liveness probe path
pub const HEALTH_ENDPOINT: &str = "/healthz";

/// Readiness probe path
pub const READY_ENDPOINT: &str = "/v1/sys/ready";

/// Submission collection path
pub const QUEUE_ENDPOINT: &str = "/v1/queue/";

const APPLICATION_JSON: &str = "application/json";

/// Answers `200 OK` with an empty body while the process is up
#[derive(Debug, Default)]
pub struct HealthHandler;

#[async_trait]
impl Handler for HealthHandler {
    async fn call(&self, _req: Request<Body>) -> Response<Body> {
        responses::ok(HeaderPolicy::Plain)
            .unwrap_or_else(|err| responses::from_error(&err, HeaderPolicy::Plain))
    }
}

/// Answers `200 OK` with an empty body once the service accepts traffic
#[derive(Debug, Default)]
pub struct ReadyHandler;

#[async_trait]
impl Handler for ReadyHandler {
    async fn call(&self, _req: Request<Body>) -> Response<Body> {
        responses::ok(HeaderPolicy::Plain)
            .unwrap_or_else(|err| responses::from_error(&err, HeaderPolicy::Plain))
    }
}

/// Decodes a JSON submission and appends it to the queue
#[derive(Debug)]
pub struct SubmitHandler {
    queue: Arc<SubmissionQueue>,
}

impl SubmitHandler {
    /// Create a handler writing to `queue`
    pub fn new(queue: Arc<SubmissionQueue>) -> Self {
        Self { queue }
    }

    fn submit(&self, headers: &HeaderMap, body: &[u8]) -> Result<Response<Body>> {
        check_json_content_type(headers)?;

        let submission: Submission = serde_json::from_slice(body)
            .map_err(|err| Error::InvalidRequest(err.to_string()))?;

        debug!(id = submission.id, "Accepted submission");
        self.queue.enqueue(submission);

        HeaderPolicy::Framed
            .respond(StatusCode::OK)
            .location(QUEUE_ENDPOINT)
            .build()
    }
}

#[async_trait]
impl Handler for SubmitHandler {
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        let (parts, body) = req.into_parts();
        let body = body_bytes(body).await;

        self.submit(&parts.headers, &body).unwrap_or_else(|err| {
            debug!(error = %err, "Rejected submission");
            responses::from_error(&err, HeaderPolicy::Framed)
        })
    }
}

/// Reports the number of queued submissions as plain text
#[derive(Debug)]
pub struct CountHandler {
    queue: Arc<SubmissionQueue>,
}

impl CountHandler {
    /// Create a handler reading from `queue`
    pub fn new(queue: Arc<SubmissionQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl Handler for CountHandler {
    async fn call(&self, _req: Request<Body>) -> Response<Body> {
        HeaderPolicy::Framed
            .respond(StatusCode::OK)
            .text(self.queue.count().to_string())
            .unwrap_or_else(|err| {
                error!(error = %err, "Failed to write queue count");
                responses::from_error(&Error::Internal(err.to_string()), HeaderPolicy::Framed)
            })
    }
}

/// Media type must be `application/json`; parameters and case are ignored
fn check_json_content_type(headers: &HeaderMap) -> Result<()> {
    let value = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let media_type = value.split(';').next().unwrap_or_default().trim();

    if media_type.eq_ignore_ascii_case(APPLICATION_JSON) {
        Ok(())
    } else {
        Err(Error::UnsupportedMediaType(value.to_string()))
    }
}

async fn body_bytes(body: Body) -> bytes::Bytes {
    use http_body_util::BodyExt;

    // Full never fails
    match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    }
}

/// Build the service's route table around `queue`
pub fn service_router(queue: Arc<SubmissionQueue>) -> Result<Router> {
    let mut router = Router::new();

    router.add_route(
        Route::builder()
            .method(Method::GET)
            .path(HEALTH_ENDPOINT)
            .handler(HealthHandler)
            .build()?,
    )?;

    router.add_route(
        Route::builder()
            .method(Method::GET)
            .path(READY_ENDPOINT)
            .handler(ReadyHandler)
            .build()?,
    )?;

    router.add_route(
        Route::builder()
            .method(Method::GET)
            .path(QUEUE_ENDPOINT)
            .headers(HeaderPolicy::Framed)
            .handler(CountHandler::new(Arc::clone(&queue)))
            .build()?,
    )?;

    router.add_route(
        Route::builder()
            .method(Method::POST)
            .path(QUEUE_ENDPOINT)
            .headers(HeaderPolicy::Framed)
            .handler(SubmitHandler::new(queue))
            .build()?,
    )?;

    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn request(method: Method, path: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(router: &Router, req: Request<Body>) -> (Response<()>, String) {
        let (parts, body) = router.call(req).await.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        (
            Response::from_parts(parts, ()),
            String::from_utf8(bytes.to_vec()).unwrap(),
        )
    }

    fn setup() -> (Arc<SubmissionQueue>, Router) {
        let queue = Arc::new(SubmissionQueue::new());
        let router = service_router(Arc::clone(&queue)).unwrap();
        (queue, router)
    }

    #[tokio::test]
    async fn test_probes() {
        let (_, router) = setup();

        for path in [HEALTH_ENDPOINT, READY_ENDPOINT] {
            let (response, body) = send(&router, request(Method::GET, path, None, "")).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(body.is_empty());
            assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
            assert!(response.headers().get(header::X_FRAME_OPTIONS).is_none());

            let (response, _) = send(&router, request(Method::POST, path, None, "")).await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");
        }
    }

    #[tokio::test]
    async fn test_count_starts_at_zero() {
        let (_, router) = setup();

        let (response, body) = send(&router, request(Method::GET, QUEUE_ENDPOINT, None, "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body, "0");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "deny");
        assert_eq!(response.headers()[header::X_XSS_PROTECTION], "1; mode=block");
    }

    #[tokio::test]
    async fn test_submit_requires_json() {
        let (queue, router) = setup();

        let req = request(
            Method::POST,
            QUEUE_ENDPOINT,
            Some("text/plain"),
            r#"{"id": 1, "timestamp": "2025-01-01T00:00:00Z"}"#,
        );
        let (response, body) = send(&router, req).await;

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body, "Unsupported Media Type");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "deny");
        assert!(queue.is_empty());

        let req = request(Method::POST, QUEUE_ENDPOINT, None, "{}");
        let (response, _) = send(&router, req).await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_body() {
        let (queue, router) = setup();

        let req = request(Method::POST, QUEUE_ENDPOINT, Some(APPLICATION_JSON), "\"not-json\"");
        let (response, body) = send(&router, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body, "Bad Request");

        let req = request(Method::POST, QUEUE_ENDPOINT, Some(APPLICATION_JSON), "not-json");
        let (response, _) = send(&router, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_submit_enqueues() {
        let (queue, router) = setup();

        let req = request(
            Method::POST,
            QUEUE_ENDPOINT,
            Some("Application/JSON; charset=utf-8"),
            r#"{"id": 42, "timestamp": "2025-01-01T00:00:00Z"}"#,
        );
        let (response, body) = send(&router, req).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body.is_empty());
        assert_eq!(response.headers()[header::LOCATION], QUEUE_ENDPOINT);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "deny");

        assert_eq!(
            queue.snapshot(),
            vec![Submission::new(42, "2025-01-01T00:00:00Z")]
        );

        let (_, body) = send(&router, request(Method::GET, QUEUE_ENDPOINT, None, "")).await;
        assert_eq!(body, "1");
    }

    #[tokio::test]
    async fn test_queue_method_not_allowed() {
        let (_, router) = setup();

        let (response, _) = send(&router, request(Method::DELETE, QUEUE_ENDPOINT, None, "")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD, POST");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "deny");
    }

    #[test]
    fn test_content_type_matching() {
        let mut headers = HeaderMap::new();
        assert!(check_json_content_type(&headers).is_err());

        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        assert!(check_json_content_type(&headers).is_ok());

        headers.insert(header::CONTENT_TYPE, "application/jsonx".parse().unwrap());
        assert!(check_json_content_type(&headers).is_err());
    }
}
