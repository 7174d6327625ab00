//! # Vex Queue
//!
//! Pending code-execution submissions. Submissions are decoded from client
//! requests, appended in arrival order and held until an executor drains
//! them. The queue is in-memory only and lives as long as the service.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod queue;
pub mod submission;

pub use queue::SubmissionQueue;
pub use submission::Submission;
