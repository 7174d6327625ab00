//! Mutex-guarded submission queue

use crate::Submission;
use parking_lot::Mutex;
use tracing::trace;

/// Ordered, append-only queue of pending submissions.
///
/// Every operation takes the same lock, so appends from concurrent request
/// handlers serialize and `count` observes all appends that completed before
/// it.
#[derive(Debug, Default)]
pub struct SubmissionQueue {
    entries: Mutex<Vec<Submission>>,
}

impl SubmissionQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a submission to the tail
    pub fn enqueue(&self, submission: Submission) {
        let id = submission.id;
        let len = {
            let mut entries = self.entries.lock();
            entries.push(submission);
            entries.len()
        };

        trace!(id, queued = len, "Submission enqueued");
    }

    /// Number of queued submissions
    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Ordered copy of the queued submissions
    pub fn snapshot(&self) -> Vec<Submission> {
        self.entries.lock().clone()
    }
}
