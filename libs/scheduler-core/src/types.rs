//! Core types for the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Default FSRS weights, used when the caller does not supply a trained set.
pub const DEFAULT_WEIGHTS: [f64; 21] = [
    0.2120, 1.2931, 2.3065, 8.2956, 6.4133, 0.8334, 3.0194, 0.0010, 1.8722, 0.1666, 0.7960,
    1.4835, 0.0614, 0.2629, 1.6483, 0.6014, 1.8729, 0.5425, 0.0912, 0.0658, 0.1542,
];

/// Queue a card currently sits in.
///
/// Always derived from the review history; storage layers may cache it but
/// the replayed value wins on mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Queue {
    New,
    Learning,
    Review,
    Relearning,
}

impl Default for Queue {
    fn default() -> Self {
        Self::New
    }
}

/// Rating given during a review.
///
/// Serialized as the 0-3 integer the clients send; mapped to FSRS grades
/// 1-4 inside the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// FSRS grade (1-4).
    pub fn grade(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }

    /// Numeric form used on the wire (0-3).
    pub fn external(self) -> u8 {
        self.grade() - 1
    }

    /// Parse the wire form.
    pub fn from_external(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Again),
            1 => Some(Self::Hard),
            2 => Some(Self::Good),
            3 => Some(Self::Easy),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Self::from_external(value).ok_or_else(|| format!("rating out of range: {value}"))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.external()
    }
}

/// One review, as appended to the event log.
///
/// Events are immutable and identified by `id`: two events with equal ids
/// are the same event, which is what makes sync idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub id: String,
    pub card_id: String,
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewEvent {
    /// Parse and validate the wire format.
    ///
    /// Unknown fields are ignored; a missing field, out-of-range rating, or
    /// unparseable timestamp is a `MalformedEvent`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SchedulerError::MalformedEvent {
            detail: e.to_string(),
        })
    }
}

/// Scheduling configuration for a deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckSettings {
    /// Target recall probability at the next review.
    pub request_retention: f64,
    /// Upper bound on any scheduled interval, in days.
    pub maximum_interval: u32,
    /// Apply deterministic jitter to intervals of three days or more.
    pub enable_fuzz: bool,
    /// FSRS weights w0-w20.
    pub w: [f64; 21],
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            request_retention: 0.9,
            maximum_interval: 36_500,
            enable_fuzz: false,
            w: DEFAULT_WEIGHTS,
        }
    }
}

impl DeckSettings {
    /// Clamp `request_retention` into the supported 0.70-0.97 band.
    pub fn validated(mut self) -> Self {
        self.request_retention = self.request_retention.clamp(0.70, 0.97);
        self
    }
}

/// Card state derived from the event log.
///
/// Never stored as ground truth; always recomputable via replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub queue: Queue,
    /// Days until recall probability drops to the target retention.
    pub stability: f64,
    /// 1.0 (easiest) to 10.0 (hardest); 0.0 while the card is new.
    pub difficulty: f64,
    /// Whole days from the last review to the next one.
    pub scheduled_days: u32,
    pub reps: u32,
    /// Again ratings given while the card was in the review queue.
    pub lapses: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl Default for CardState {
    fn default() -> Self {
        Self {
            queue: Queue::New,
            stability: 0.0,
            difficulty: 0.0,
            scheduled_days: 0,
            reps: 0,
            lapses: 0,
            next_review_at: None,
            last_reviewed_at: None,
        }
    }
}

impl CardState {
    /// True once the scheduled review time has arrived.
    ///
    /// New cards have no schedule and report false; study queues introduce
    /// them separately.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_review_at {
            Some(due) => due <= now,
            None => false,
        }
    }
}

/// Cached derived state as of a known point in the event log.
///
/// Purely an optimization: always re-derivable from events, discarded when
/// newer events exist. Checkpoints do not embed settings, so callers must
/// discard them when the weight vector or target retention changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCheckpoint {
    pub card_id: String,
    /// Review timestamp of the last event folded in.
    pub checkpoint_at: DateTime<Utc>,
    pub event_count: u32,
    pub state: CardState,
}
