//! Rating previews, recall probability, and interval formatting.
//!
//! Study screens show all four rating buttons with the interval each would
//! schedule. Previews run the kernel on a copy of the state, so showing
//! them commits nothing.

use chrono::{DateTime, Utc};

use crate::algorithm::Fsrs;
use crate::types::{CardState, DeckSettings, Queue, Rating};

/// What one rating would do to a card right now.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalPreview {
    pub rating: Rating,
    /// Short human-readable interval, e.g. "<10m", "3d", "1.5mo".
    pub interval_text: String,
    /// Interval in fractional days.
    pub interval_days: f64,
    /// Queue the card would land in.
    pub queue: Queue,
}

/// Preview all four ratings, in Again, Hard, Good, Easy order.
pub fn interval_previews(
    state: &CardState,
    card_id: &str,
    settings: &DeckSettings,
    now: DateTime<Utc>,
) -> [IntervalPreview; 4] {
    let fsrs = Fsrs::new(settings.clone());

    [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy].map(|rating| {
        let next = fsrs.next(state, card_id, rating, now);
        let minutes = match next.next_review_at {
            Some(due) => (due - now).num_seconds() as f64 / 60.0,
            None => 0.0,
        };

        IntervalPreview {
            rating,
            interval_text: format_interval(minutes, true),
            interval_days: minutes / 1440.0,
            queue: next.queue,
        }
    })
}

/// Probability the card is recalled at `now`; 1.0 for a card never reviewed.
pub fn retrievability(state: &CardState, settings: &DeckSettings, now: DateTime<Utc>) -> f64 {
    if state.queue == Queue::New {
        return 1.0;
    }

    let elapsed = Fsrs::elapsed_days(state.last_reviewed_at, now);
    let fsrs = Fsrs::new(settings.clone());
    fsrs.retrievability(elapsed as f64, state.stability)
        .clamp(0.0, 1.0)
}

/// Render a minute count the way the rating buttons show it.
///
/// `use_less_than` elides anything under ten minutes to "<10m", which is
/// what study screens want for sub-step learning intervals.
pub fn format_interval(minutes: f64, use_less_than: bool) -> String {
    let minutes = minutes.max(0.0);

    if use_less_than && minutes < 10.0 {
        return "<10m".to_string();
    }
    if minutes < 60.0 {
        return format!("{}m", minutes.round() as i64);
    }
    if minutes < 1440.0 {
        return format!("{}h", (minutes / 60.0).round() as i64);
    }

    let days = minutes / 1440.0;
    if days < 7.0 {
        return format!("{}d", days.round() as i64);
    }
    if days < 30.0 {
        return format!("{}w", one_decimal(days / 7.0));
    }
    if days < 365.0 {
        return format!("{}mo", one_decimal(days / 30.0));
    }
    format!("{}y", one_decimal(days / 365.0))
}

/// One decimal place, dropped when the value is whole.
fn one_decimal(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded:.1}")
    }
}
