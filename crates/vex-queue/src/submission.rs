//! Submission record

use serde::{Deserialize, Serialize};

/// A code execution request sent by a client.
///
/// Decoding is lenient: unknown fields are ignored and absent fields fall
/// back to their zero value. Neither the id's uniqueness nor the timestamp's
/// format is checked at this tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Submission {
    /// Client-chosen identifier
    pub id: i64,

    /// RFC3339 time at which the client created this submission, later used
    /// to measure queue-to-execution latency
    pub timestamp: String,
}

impl Submission {
    /// Create a submission
    pub fn new(id: i64, timestamp: impl Into<String>) -> Self {
        Self {
            id,
            timestamp: timestamp.into(),
        }
    }
}
