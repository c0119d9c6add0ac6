//! Event replay: fold an ordered review history into a card state.
//!
//! The event log is the ground truth. Scheduling fields a store or client
//! holds are caches of this fold; on disagreement, the replayed value wins.

use tracing::warn;

use crate::algorithm::Fsrs;
use crate::error::{Result, SchedulerError};
use crate::types::{CardCheckpoint, CardState, DeckSettings, ReviewEvent};

/// Fold `events` into the card's current state.
///
/// `events` must be sorted by `reviewed_at` ascending, ties broken by `id`;
/// a strictly decreasing timestamp aborts with `OutOfOrderEvents`.
/// Consecutive events sharing an `id` fold once: a sync layer that replays
/// an already-applied event must not advance the state twice.
///
/// A usable `checkpoint` fast-forwards replay to the first event newer than
/// `checkpoint_at`. A checkpoint naming a different card is ignored with a
/// warning and the history is replayed from scratch.
pub fn compute_state(
    events: &[ReviewEvent],
    settings: &DeckSettings,
    checkpoint: Option<&CardCheckpoint>,
) -> Result<CardState> {
    let fsrs = Fsrs::new(settings.clone());

    let checkpoint = checkpoint.filter(|cp| {
        let matches = events.first().map_or(true, |event| event.card_id == cp.card_id);
        if !matches {
            warn!(
                checkpoint_card_id = %cp.card_id,
                "checkpoint belongs to a different card, replaying from scratch"
            );
        }
        matches
    });

    let (mut state, resume_at) = match checkpoint {
        Some(cp) => {
            match events
                .iter()
                .position(|event| event.reviewed_at > cp.checkpoint_at)
            {
                Some(index) => (cp.state.clone(), index),
                None => return Ok(cp.state.clone()),
            }
        }
        None => (fsrs.initial_state(), 0),
    };

    let mut prev: Option<&ReviewEvent> = None;
    for event in &events[resume_at..] {
        if let Some(prev) = prev {
            if event.reviewed_at < prev.reviewed_at {
                return Err(SchedulerError::OutOfOrderEvents {
                    prev: prev.reviewed_at,
                    next: event.reviewed_at,
                });
            }
            if event.id == prev.id {
                continue;
            }
        }
        state = fsrs.next(&state, &event.card_id, event.rating, event.reviewed_at);
        prev = Some(event);
    }

    Ok(state)
}
