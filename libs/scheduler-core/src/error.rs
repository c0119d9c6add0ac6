//! Error types for scheduler-core.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias using SchedulerError.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors surfaced while validating or replaying review events.
///
/// The kernel itself never fails: out-of-domain intermediate values are
/// clamped, not trapped. A checkpoint naming the wrong card is also not an
/// error; the replayer warns and falls back to a full replay.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("malformed review event: {detail}")]
    MalformedEvent { detail: String },

    #[error("review events out of order: {prev} followed by {next}")]
    OutOfOrderEvents {
        prev: DateTime<Utc>,
        next: DateTime<Utc>,
    },
}
