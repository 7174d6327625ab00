//! # Vex Core
//!
//! Core types shared by every Vex crate:
//! - Error taxonomy and HTTP status mapping
//! - Response shaping with the service's header policy
//! - The [`Handler`] trait that routes dispatch into

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod handler;
pub mod response;

pub use error::{Error, Result};
pub use handler::Handler;
pub use response::{Body, HeaderPolicy, ResponseBuilder};

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::{Method, Request, Response, StatusCode};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::handler::Handler;
    pub use crate::response::{responses, Body, HeaderPolicy, ResponseBuilder};
}
