//! Deterministic interval fuzz.
//!
//! Spreads review dates so cards introduced together do not stay clustered
//! on the same calendar day. The jitter is a pure function of the card id
//! and the review timestamp: a client and the server folding the same event
//! compute the same fuzzed interval, with no wall-clock or process state
//! involved.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// Intervals shorter than this are scheduled exactly.
const MIN_FUZZ_DAYS: u32 = 3;

/// Fuzz bands: (start, end, factor) over interval days. The allowed range
/// widens as the interval grows.
const FUZZ_BANDS: [(f64, f64, f64); 3] = [
    (2.5, 7.0, 0.15),
    (7.0, 20.0, 0.10),
    (20.0, f64::MAX, 0.05),
];

/// Jitter `interval` (whole days) into a nearby integer.
///
/// The result never leaves `[1, maximum_interval]`.
pub fn apply(
    interval: u32,
    maximum_interval: u32,
    card_id: &str,
    reviewed_at: DateTime<Utc>,
) -> u32 {
    if interval < MIN_FUZZ_DAYS {
        return interval;
    }

    let (min_ivl, max_ivl) = fuzz_range(interval, maximum_interval);
    if min_ivl >= max_ivl {
        return min_ivl;
    }

    let span = u64::from(max_ivl - min_ivl) + 1;
    let roll = splitmix64(seed(card_id, reviewed_at)) % span;
    min_ivl + roll as u32
}

/// Inclusive range of plausible intervals around `interval`.
fn fuzz_range(interval: u32, maximum_interval: u32) -> (u32, u32) {
    let ivl = f64::from(interval);
    let mut delta = 1.0;
    for (start, end, factor) in FUZZ_BANDS {
        delta += factor * (ivl.min(end) - start).max(0.0);
    }

    let min_ivl = (ivl - delta).round().max(1.0) as u32;
    let max_ivl = (ivl + delta).round().min(f64::from(maximum_interval)) as u32;
    (min_ivl.min(max_ivl), max_ivl)
}

/// Stable 64-bit seed from the card id and review instant.
fn seed(card_id: &str, reviewed_at: DateTime<Utc>) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(card_id.as_bytes());
    hasher.update([0]);
    hasher.update(
        reviewed_at
            .to_rfc3339_opts(SecondsFormat::Secs, true)
            .as_bytes(),
    );
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
