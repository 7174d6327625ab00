//! # Vex Runtime
//!
//! Service runtime and lifecycle management with:
//! - Connection admission control (bounded open connections, header timeout)
//! - Probe and submission-queue endpoints
//! - Lifecycle state machine (validate, start, stop)
//! - Graceful shutdown with signal handling

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod endpoints;
pub mod handler;
pub mod listener;
pub mod service;
pub mod shutdown;

pub use endpoints::{service_router, HEALTH_ENDPOINT, QUEUE_ENDPOINT, READY_ENDPOINT};
pub use handler::RequestHandler;
pub use listener::{LimitListener, LimitedStream};
pub use service::Service;
pub use shutdown::{os_signal, serve_until, SignalHandler};

/// Version of the service core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime state, in lifecycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuntimeState {
    /// Constructed, not yet validated
    Unstarted,
    /// Validation passed
    Validated,
    /// Listener bound and accepting
    Serving,
    /// No longer accepting; waiting for in-flight requests
    Draining,
    /// Terminal
    Stopped,
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::service::Service;
    pub use crate::shutdown::{os_signal, serve_until, SignalHandler};
    pub use crate::RuntimeState;
}
