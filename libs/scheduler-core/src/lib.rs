//! Event-sourced FSRS scheduler core.
//!
//! The review history is the ground truth: a card's queue, memory state, and
//! next review time are always derived by folding its events through the
//! FSRS transition function. Checkpoints cache a derived state so mature
//! cards replay fast; they are never authoritative.
//!
//! Provides:
//! - FSRS kernel (`Fsrs`): pure per-review state transition
//! - Event replay (`compute_state`) with checkpoint fast-forward
//! - Checkpoint creation and staleness checks
//! - Rating previews, recall probability, and interval formatting
//!
//! The library does no I/O, holds no global state, and is deterministic:
//! the same events and settings produce bit-identical states on every
//! platform and run, including the interval fuzz, which is seeded from the
//! card id and review timestamp.

pub mod algorithm;
pub mod checkpoint;
pub mod error;
pub mod preview;
pub mod replay;
pub mod types;

pub use algorithm::Fsrs;
pub use checkpoint::{create_checkpoint, is_stale};
pub use error::{Result, SchedulerError};
pub use preview::{format_interval, interval_previews, retrievability, IntervalPreview};
pub use replay::compute_state;
pub use types::{
    CardCheckpoint, CardState, DeckSettings, Queue, Rating, ReviewEvent, DEFAULT_WEIGHTS,
};
