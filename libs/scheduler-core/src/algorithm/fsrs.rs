//! FSRS (Free Spaced Repetition Scheduler) transition function.
//!
//! DSR memory model:
//! - Difficulty (D): card difficulty 1-10
//! - Stability (S): days until recall probability drops to the target retention
//! - Retrievability (R): probability of recall right now

use chrono::{DateTime, Duration, Utc};

use super::fuzz;
use crate::types::{CardState, DeckSettings, Queue, Rating};

/// Lower clamp applied to stability after every formula.
const MIN_STABILITY: f64 = 0.01;

/// FSRS kernel over a fixed settings value.
///
/// Construct one at the call site (or cache one per settings version); the
/// kernel carries no other state and `next` is pure, so a cached instance
/// and a fresh one are interchangeable.
#[derive(Debug, Clone)]
pub struct Fsrs {
    settings: DeckSettings,
}

impl Fsrs {
    pub fn new(settings: DeckSettings) -> Self {
        Self {
            settings: settings.validated(),
        }
    }

    pub fn settings(&self) -> &DeckSettings {
        &self.settings
    }

    /// Canonical state of a card that has never been reviewed.
    pub fn initial_state(&self) -> CardState {
        CardState::default()
    }

    /// Apply one review and produce the successor state.
    ///
    /// Never mutates the input and never fails. `card_id` participates only
    /// in the fuzz seed; with fuzz disabled it does not influence the result.
    pub fn next(
        &self,
        state: &CardState,
        card_id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> CardState {
        if state.queue == Queue::New {
            self.first_review(rating, now)
        } else {
            self.subsequent_review(state, card_id, rating, now)
        }
    }

    /// Probability of recall after `elapsed_days` at the given stability.
    pub(crate) fn retrievability(&self, elapsed_days: f64, stability: f64) -> f64 {
        if stability <= 0.0 {
            return 0.0;
        }
        (1.0 + elapsed_days / (self.factor() * stability)).powf(self.decay())
    }

    /// Whole days elapsed since the last review, never negative.
    pub(crate) fn elapsed_days(last_reviewed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
        match last_reviewed_at {
            Some(last) => ((now - last).num_seconds() / 86_400).max(0),
            None => 0,
        }
    }

    fn first_review(&self, rating: Rating, now: DateTime<Utc>) -> CardState {
        let grade = rating.grade();
        let stability = self.initial_stability(grade);
        let difficulty = self.initial_difficulty(grade);

        // Easy skips the learning queue entirely; the first-ever Again is
        // not a lapse.
        if rating == Rating::Easy {
            let scheduled_days = self.interval_days(stability);
            CardState {
                queue: Queue::Review,
                stability,
                difficulty,
                scheduled_days,
                reps: 1,
                lapses: 0,
                next_review_at: Some(now + Duration::days(i64::from(scheduled_days))),
                last_reviewed_at: Some(now),
            }
        } else {
            CardState {
                queue: Queue::Learning,
                stability,
                difficulty,
                scheduled_days: 0,
                reps: 1,
                lapses: 0,
                next_review_at: Some(Self::short_term_due(now, stability)),
                last_reviewed_at: Some(now),
            }
        }
    }

    fn subsequent_review(
        &self,
        state: &CardState,
        card_id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> CardState {
        let grade = rating.grade();
        let elapsed = Self::elapsed_days(state.last_reviewed_at, now);
        let retrievability = self.retrievability(elapsed as f64, state.stability);

        let mut next = state.clone();
        next.difficulty = self.next_difficulty(state.difficulty, grade);
        next.reps = state.reps + 1;
        next.last_reviewed_at = Some(now);

        if rating == Rating::Again {
            let stability =
                self.next_stability_forget(state.stability, state.difficulty, retrievability);
            next.queue = match state.queue {
                Queue::Review => {
                    next.lapses = state.lapses + 1;
                    Queue::Relearning
                }
                // Failing a sub-day step repeats it without counting a lapse.
                queue => queue,
            };
            next.stability = stability;
            next.scheduled_days = 0;
            next.next_review_at = Some(Self::short_term_due(now, stability));
        } else {
            let stability = self.next_stability_recall(
                state.stability,
                state.difficulty,
                retrievability,
                grade,
            );
            let mut scheduled_days = self.interval_days(stability);
            if self.settings.enable_fuzz {
                scheduled_days =
                    fuzz::apply(scheduled_days, self.settings.maximum_interval, card_id, now);
            }
            next.queue = Queue::Review;
            next.stability = stability;
            next.scheduled_days = scheduled_days;
            next.next_review_at = Some(now + Duration::days(i64::from(scheduled_days)));
        }

        next
    }

    fn decay(&self) -> f64 {
        -self.settings.w[20]
    }

    fn factor(&self) -> f64 {
        0.9_f64.powf(1.0 / self.decay()) - 1.0
    }

    /// S0(g) = w[g-1]
    fn initial_stability(&self, grade: u8) -> f64 {
        let s0 = self.settings.w[usize::from(grade - 1)];
        s0.clamp(MIN_STABILITY, f64::from(self.settings.maximum_interval))
    }

    /// D0(g) = w4 - e^(w5 * (g - 1)) + 1
    fn initial_difficulty(&self, grade: u8) -> f64 {
        let w = &self.settings.w;
        let d0 = w[4] - (w[5] * f64::from(grade - 1)).exp() + 1.0;
        d0.clamp(1.0, 10.0)
    }

    /// D' = w7 * D0(3) + (1 - w7) * (D - w6 * (g - 3))
    ///
    /// Mean reversion toward the difficulty a first Good rating would set.
    fn next_difficulty(&self, difficulty: f64, grade: u8) -> f64 {
        let w = &self.settings.w;
        let shifted = difficulty - w[6] * (f64::from(grade) - 3.0);
        let d = w[7] * self.initial_difficulty(3) + (1.0 - w[7]) * shifted;
        d.clamp(1.0, 10.0)
    }

    /// S' = S * (1 + e^w8 * (11 - D) * S^-w9 * (e^(w10 * (1 - R)) - 1) * penalties)
    fn next_stability_recall(
        &self,
        stability: f64,
        difficulty: f64,
        retrievability: f64,
        grade: u8,
    ) -> f64 {
        let w = &self.settings.w;
        let hard_penalty = if grade == 2 { w[15] } else { 1.0 };
        let easy_bonus = if grade == 4 { w[16] } else { 1.0 };

        let growth = w[8].exp()
            * (11.0 - difficulty)
            * stability.powf(-w[9])
            * ((w[10] * (1.0 - retrievability)).exp() - 1.0);

        let s = stability * (1.0 + growth * hard_penalty * easy_bonus);
        s.clamp(MIN_STABILITY, f64::from(self.settings.maximum_interval))
    }

    /// S' = w11 * D^-w12 * ((S + 1)^w13 - 1) * e^(w14 * (1 - R))
    fn next_stability_forget(&self, stability: f64, difficulty: f64, retrievability: f64) -> f64 {
        let w = &self.settings.w;
        let s = w[11]
            * difficulty.powf(-w[12])
            * ((stability + 1.0).powf(w[13]) - 1.0)
            * (w[14] * (1.0 - retrievability)).exp();
        s.clamp(MIN_STABILITY, f64::from(self.settings.maximum_interval))
    }

    /// I(S) = (S / FACTOR) * (retention^(1 / DECAY) - 1), rounded to whole
    /// days and clamped to [1, maximum_interval].
    fn interval_days(&self, stability: f64) -> u32 {
        let retention = self.settings.request_retention;
        let interval = (stability / self.factor()) * (retention.powf(1.0 / self.decay()) - 1.0);
        interval
            .round()
            .clamp(1.0, f64::from(self.settings.maximum_interval)) as u32
    }

    /// Sub-day delay for the learning queues: stability read as minutes,
    /// floored at one minute.
    fn short_term_minutes(stability: f64) -> f64 {
        stability.max(1.0)
    }

    fn short_term_due(now: DateTime<Utc>, stability: f64) -> DateTime<Utc> {
        let seconds = (Self::short_term_minutes(stability) * 60.0).round() as i64;
        now + Duration::seconds(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2024-01-15T10:00:00Z".parse().unwrap()
    }

    fn kernel() -> Fsrs {
        Fsrs::new(DeckSettings::default())
    }

    fn review_state(stability: f64, difficulty: f64, last: DateTime<Utc>) -> CardState {
        CardState {
            queue: Queue::Review,
            stability,
            difficulty,
            scheduled_days: stability.round() as u32,
            reps: 3,
            lapses: 0,
            next_review_at: Some(last + Duration::days(stability.round() as i64)),
            last_reviewed_at: Some(last),
        }
    }

    #[test]
    fn new_card_good_enters_learning() {
        let fsrs = kernel();
        let next = fsrs.next(&fsrs.initial_state(), "c1", Rating::Good, t0());

        assert_eq!(next.queue, Queue::Learning);
        assert_eq!(next.reps, 1);
        assert_eq!(next.lapses, 0);
        assert_eq!(next.scheduled_days, 0);
        assert_eq!(next.stability, 2.3065);
        assert!(next.difficulty >= 1.0 && next.difficulty <= 10.0);
        assert_eq!(next.last_reviewed_at, Some(t0()));
        // Learning step is sub-day.
        assert!(next.next_review_at.unwrap() < t0() + Duration::hours(1));
    }

    #[test]
    fn new_card_easy_skips_to_review() {
        let fsrs = kernel();
        let next = fsrs.next(&fsrs.initial_state(), "c1", Rating::Easy, t0());

        assert_eq!(next.queue, Queue::Review);
        assert_eq!(next.stability, 8.2956);
        assert!(next.scheduled_days >= 7 && next.scheduled_days <= 10);
        assert_eq!(
            next.next_review_at,
            Some(t0() + Duration::days(i64::from(next.scheduled_days)))
        );
    }

    #[test]
    fn first_again_is_not_a_lapse() {
        let fsrs = kernel();
        let next = fsrs.next(&fsrs.initial_state(), "c1", Rating::Again, t0());

        assert_eq!(next.queue, Queue::Learning);
        assert_eq!(next.lapses, 0);
        assert_eq!(next.reps, 1);
    }

    #[test]
    fn initial_stability_rises_with_grade() {
        let fsrs = kernel();
        let s: Vec<f64> = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy]
            .iter()
            .map(|&r| fsrs.next(&fsrs.initial_state(), "c1", r, t0()).stability)
            .collect();

        assert!(s[0] < s[1] && s[1] < s[2] && s[2] < s[3]);
    }

    #[test]
    fn review_good_grows_stability() {
        let fsrs = kernel();
        let state = review_state(5.0, 5.0, t0());
        let next = fsrs.next(&state, "c1", Rating::Good, t0() + Duration::days(5));

        assert_eq!(next.queue, Queue::Review);
        assert!(next.stability > state.stability);
        assert_eq!(next.reps, state.reps + 1);
        assert_eq!(next.lapses, 0);
        assert!(next.scheduled_days >= 1);
    }

    #[test]
    fn review_again_lapses_into_relearning() {
        let fsrs = kernel();
        let state = review_state(10.0, 5.0, t0());
        let next = fsrs.next(&state, "c1", Rating::Again, t0() + Duration::days(10));

        assert_eq!(next.queue, Queue::Relearning);
        assert_eq!(next.lapses, 1);
        assert!(next.stability < state.stability);
        assert_eq!(next.scheduled_days, 0);
        // Relearning step is sub-day.
        assert!(next.next_review_at.unwrap() < t0() + Duration::days(11));
    }

    #[test]
    fn hard_penalty_and_easy_bonus_order_stability() {
        let fsrs = kernel();
        let state = review_state(10.0, 5.0, t0());
        let now = t0() + Duration::days(10);

        let hard = fsrs.next(&state, "c1", Rating::Hard, now);
        let good = fsrs.next(&state, "c1", Rating::Good, now);
        let easy = fsrs.next(&state, "c1", Rating::Easy, now);

        assert!(hard.stability < good.stability);
        assert!(good.stability < easy.stability);
    }

    #[test]
    fn learning_graduates_on_good() {
        let fsrs = kernel();
        let learning = fsrs.next(&fsrs.initial_state(), "c1", Rating::Good, t0());
        let next = fsrs.next(&learning, "c1", Rating::Good, t0() + Duration::minutes(3));

        assert_eq!(next.queue, Queue::Review);
        assert!(next.scheduled_days >= 1);
        assert_eq!(next.lapses, 0);
    }

    #[test]
    fn learning_again_stays_learning_without_lapse() {
        let fsrs = kernel();
        let learning = fsrs.next(&fsrs.initial_state(), "c1", Rating::Again, t0());
        let next = fsrs.next(&learning, "c1", Rating::Again, t0() + Duration::minutes(2));

        assert_eq!(next.queue, Queue::Learning);
        assert_eq!(next.lapses, 0);
        assert_eq!(next.reps, 2);
    }

    #[test]
    fn relearning_graduates_on_good() {
        let fsrs = kernel();
        let state = review_state(10.0, 5.0, t0());
        let relearning = fsrs.next(&state, "c1", Rating::Again, t0() + Duration::days(10));
        let next = fsrs.next(
            &relearning,
            "c1",
            Rating::Good,
            t0() + Duration::days(10) + Duration::minutes(5),
        );

        assert_eq!(next.queue, Queue::Review);
        assert!(next.scheduled_days >= 1);
        assert_eq!(next.lapses, 1);
    }

    #[test]
    fn difficulty_rises_on_again_and_falls_on_easy() {
        let fsrs = kernel();
        let state = review_state(5.0, 5.0, t0());
        let now = t0() + Duration::days(5);

        assert!(fsrs.next(&state, "c1", Rating::Again, now).difficulty > 5.0);
        assert!(fsrs.next(&state, "c1", Rating::Easy, now).difficulty < 5.0);
    }

    #[test]
    fn difficulty_stays_in_bounds_under_repetition() {
        let fsrs = kernel();
        let mut state = fsrs.next(&fsrs.initial_state(), "c1", Rating::Easy, t0());
        let mut now = t0();

        for _ in 0..30 {
            now += Duration::days(1);
            state = fsrs.next(&state, "c1", Rating::Again, now);
            assert!(state.difficulty >= 1.0 && state.difficulty <= 10.0);
        }
        for _ in 0..30 {
            now += Duration::days(1);
            state = fsrs.next(&state, "c1", Rating::Easy, now);
            assert!(state.difficulty >= 1.0 && state.difficulty <= 10.0);
        }
    }

    #[test]
    fn stability_and_interval_respect_maximum() {
        let settings = DeckSettings {
            maximum_interval: 365,
            ..Default::default()
        };
        let fsrs = Fsrs::new(settings);
        let state = review_state(300.0, 2.0, t0());
        let next = fsrs.next(&state, "c1", Rating::Easy, t0() + Duration::days(300));

        assert!(next.stability <= 365.0);
        assert!(next.scheduled_days <= 365);
    }

    #[test]
    fn retrievability_is_full_at_zero_elapsed() {
        let fsrs = kernel();
        assert_eq!(fsrs.retrievability(0.0, 10.0), 1.0);
    }

    #[test]
    fn retrievability_decays_over_time() {
        let fsrs = kernel();
        let r1 = fsrs.retrievability(1.0, 10.0);
        let r5 = fsrs.retrievability(5.0, 10.0);
        let r30 = fsrs.retrievability(30.0, 10.0);

        assert!(r1 > r5 && r5 > r30);
        assert!(r30 > 0.0 && r1 < 1.0);
    }

    #[test]
    fn elapsed_days_floors_and_never_goes_negative() {
        let last = Some(t0());
        assert_eq!(Fsrs::elapsed_days(last, t0() + Duration::hours(36)), 1);
        assert_eq!(Fsrs::elapsed_days(last, t0() + Duration::days(8)), 8);
        assert_eq!(Fsrs::elapsed_days(last, t0() - Duration::hours(2)), 0);
        assert_eq!(Fsrs::elapsed_days(None, t0()), 0);
    }

    #[test]
    fn transition_is_bit_reproducible() {
        let fsrs = kernel();
        let state = review_state(7.3, 4.2, t0());
        let now = t0() + Duration::days(9);

        let a = fsrs.next(&state, "c1", Rating::Good, now);
        let b = fsrs.next(&state, "c1", Rating::Good, now);
        assert_eq!(a, b);
        assert_eq!(a.stability.to_bits(), b.stability.to_bits());
        assert_eq!(a.difficulty.to_bits(), b.difficulty.to_bits());
    }

    #[test]
    fn fuzz_only_changes_interval_within_range() {
        let settings = DeckSettings {
            enable_fuzz: true,
            ..Default::default()
        };
        let fsrs = Fsrs::new(settings);
        let plain = kernel();
        let state = review_state(20.0, 4.0, t0());
        let now = t0() + Duration::days(20);

        let fuzzed = fsrs.next(&state, "c1", Rating::Good, now);
        let exact = plain.next(&state, "c1", Rating::Good, now);

        assert_eq!(fuzzed.stability, exact.stability);
        let spread = (i64::from(fuzzed.scheduled_days) - i64::from(exact.scheduled_days)).abs();
        assert!(spread <= 6, "fuzz moved the interval by {spread} days");
        // Same seed, same jitter.
        let again = fsrs.next(&state, "c1", Rating::Good, now);
        assert_eq!(again.scheduled_days, fuzzed.scheduled_days);
    }
}
