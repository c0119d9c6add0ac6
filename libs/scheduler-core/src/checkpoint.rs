//! Checkpoints: cached derived state that bounds replay cost.
//!
//! A mature card can carry hundreds of events; folding all of them on every
//! read does not scale. A checkpoint snapshots the fold at a known event so
//! replay only walks the suffix. It is always re-derivable and never wins
//! an argument with the event log.

use chrono::{DateTime, Utc};

use crate::types::{CardCheckpoint, CardState, ReviewEvent};

/// Snapshot `state` as of `last_event`.
///
/// The checkpoint is a value copy; later changes to `state` do not reach it.
pub fn create_checkpoint(
    card_id: &str,
    state: &CardState,
    last_event: &ReviewEvent,
    event_count: u32,
) -> CardCheckpoint {
    CardCheckpoint {
        card_id: card_id.to_string(),
        checkpoint_at: last_event.reviewed_at,
        event_count,
        state: state.clone(),
    }
}

/// True when an event newer than the checkpoint exists.
///
/// `None` means no event timestamp is known, which leaves the checkpoint
/// current.
pub fn is_stale(checkpoint: &CardCheckpoint, latest_event_at: Option<DateTime<Utc>>) -> bool {
    latest_event_at.map_or(false, |at| at > checkpoint.checkpoint_at)
}
