//! Error types for the Vex service

use std::time::Duration;

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for the Vex service
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service has no live server handle (not started, or already stopped)
    #[error("service's server must not be missing")]
    MissingServer,

    /// The service was built without a request handler
    #[error("service's handler must not be missing")]
    MissingHandler,

    /// The service was built without a logger
    #[error("service's logger must not be missing")]
    MissingLogger,

    /// The listen address could not be resolved
    #[error("failed to resolve server addr '{addr}': {reason}")]
    InvalidAddress {
        /// Address as configured
        addr: String,
        /// Why resolution failed
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Binding the listen address failed
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind
        addr: std::net::SocketAddr,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Accepting a connection failed in a way the server cannot recover from
    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// Graceful shutdown did not finish in time
    #[error("graceful shutdown exceeded its {0:?} deadline")]
    ShutdownTimeout(Duration),

    /// Runtime error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Request content type is not accepted by the endpoint
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Invalid HTTP request
    #[error("Invalid HTTP request: {0}")]
    InvalidRequest(String),

    /// Path exists but not for this method
    #[error("Method {method} not allowed")]
    MethodNotAllowed {
        /// Method of the rejected request
        method: http::Method,
        /// Methods registered for the path
        allowed: Vec<http::Method>,
    },

    /// Route not found
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] http::Error),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Error::RouteNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error stems from validating the service configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::MissingServer
                | Error::MissingHandler
                | Error::MissingLogger
                | Error::InvalidAddress { .. }
                | Error::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            Error::InvalidRequest("bad json".to_string()).to_status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::UnsupportedMediaType("text/plain".to_string()).to_status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            Error::MethodNotAllowed {
                method: Method::PUT,
                allowed: vec![Method::GET],
            }
            .to_status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            Error::RouteNotFound("/nope".to_string()).to_status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Internal("boom".to_string()).to_status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_config_errors() {
        assert!(Error::MissingServer.is_config_error());
        assert!(Error::MissingLogger.is_config_error());
        assert!(Error::InvalidAddress {
            addr: "nope".to_string(),
            reason: "missing port".to_string(),
        }
        .is_config_error());
        assert!(!Error::ShutdownTimeout(Duration::from_secs(1)).is_config_error());
    }

    #[test]
    fn test_missing_server_message() {
        assert_eq!(
            Error::MissingServer.to_string(),
            "service's server must not be missing"
        );
    }
}
