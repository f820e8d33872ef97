//! SM-2 review scheduling.
//!
//! A recall with quality 3 or more grows the interval (1 day, then 6 days,
//! then the previous interval times the easiness factor). Anything lower is a
//! lapse: the streak resets and the question comes back tomorrow. The
//! easiness factor moves on every answer and never drops below 1.3. Intervals
//! stop growing at `MAX_INTERVAL_DAYS`.

use chrono::{DateTime, Duration, Utc};

use crate::config::QualityThresholds;
use crate::data::models::{MAX_INTERVAL_DAYS, MIN_EASINESS, Quality, ReviewState};

/// Applies one answer of the given quality to `state`.
pub fn update_review_state(quality: Quality, state: &ReviewState, now: DateTime<Utc>) -> ReviewState {
    let (interval_days, repetition_count) = if quality.is_recall() {
        let interval = match state.repetition_count {
            0 => 1,
            1 => 6,
            _ => {
                let grown = (f64::from(state.interval_days) * state.easiness_factor).round();
                grown.min(f64::from(MAX_INTERVAL_DAYS)) as u32
            }
        };
        (
            interval.clamp(1, MAX_INTERVAL_DAYS),
            state.repetition_count.saturating_add(1),
        )
    } else {
        (1, 0)
    };

    let q = 5.0 - quality.value() as f64;
    let easiness_factor = (state.easiness_factor + (0.1 - q * (0.08 + q * 0.02))).max(MIN_EASINESS);

    let mut quality_history = state.quality_history.clone();
    quality_history.push(quality.value());

    ReviewState {
        easiness_factor,
        repetition_count,
        interval_days,
        next_review_date: now
            .checked_add_signed(Duration::days(i64::from(interval_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        quality_history,
        total_reviews: state.total_reviews.saturating_add(1),
    }
}

/// Derives a quality score from correctness and how long the learner took.
pub fn quality_from_answer(
    is_correct: bool,
    response_secs: f64,
    thresholds: &QualityThresholds,
) -> Quality {
    let score = match (is_correct, response_secs) {
        (true, secs) if secs < thresholds.fast_answer_secs => 5,
        (true, _) => 4,
        (false, secs) if secs < thresholds.guess_secs => 1,
        (false, _) => 2,
    };
    Quality::saturating(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    #[test]
    fn first_answer_defaults() {
        let state = ReviewState::new_at(now());
        assert_eq!(state.easiness_factor, 2.5);
        assert_eq!(state.repetition_count, 0);
        assert_eq!(state.interval_days, 1);
    }

    #[test]
    fn lapse_always_resets_streak_and_interval() {
        for prior_reps in [0, 1, 2, 7] {
            for prior_interval in [1, 6, 40, 300] {
                for quality in 0..3 {
                    let state = ReviewState {
                        easiness_factor: 2.1,
                        repetition_count: prior_reps,
                        interval_days: prior_interval,
                        ..ReviewState::new_at(now())
                    };
                    let next = update_review_state(q(quality), &state, now());
                    assert_eq!(next.repetition_count, 0);
                    assert_eq!(next.interval_days, 1);
                    assert_eq!(next.next_review_date, now() + Duration::days(1));
                }
            }
        }
    }

    #[test]
    fn easiness_never_drops_below_floor() {
        let mut state = ReviewState::new_at(now());
        for _ in 0..50 {
            state = update_review_state(q(0), &state, now());
            assert!(state.easiness_factor >= MIN_EASINESS);
        }
        assert_eq!(state.easiness_factor, MIN_EASINESS);
    }

    #[test]
    fn consecutive_perfect_answers_follow_1_6_then_easiness() {
        let first = update_review_state(q(5), &ReviewState::new_at(now()), now());
        assert_eq!(first.interval_days, 1);

        let second = update_review_state(q(5), &first, now());
        assert_eq!(second.interval_days, 6);

        let third = update_review_state(q(5), &second, now());
        let expected = (6.0 * second.easiness_factor).round() as u32;
        assert_eq!(third.interval_days, expected);
        assert_eq!(third.interval_days, 16);
        assert_eq!(third.repetition_count, 3);
    }

    #[test]
    fn easiness_has_no_ceiling() {
        let mut state = ReviewState::new_at(now());
        for _ in 0..20 {
            state = update_review_state(q(5), &state, now());
        }
        assert!((state.easiness_factor - 4.5).abs() < 1e-9);
    }

    #[test]
    fn long_perfect_streak_caps_the_interval() {
        let mut state = ReviewState::new_at(now());
        for _ in 0..100 {
            state = update_review_state(q(5), &state, now());
            assert!(state.interval_days <= MAX_INTERVAL_DAYS);
        }
        assert_eq!(state.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(
            state.next_review_date,
            now() + Duration::days(i64::from(MAX_INTERVAL_DAYS))
        );
        assert!(state.easiness_factor > 12.0);
    }

    #[test]
    fn review_date_saturates_near_the_end_of_time() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::days(3);
        let state = ReviewState {
            repetition_count: 4,
            interval_days: 400,
            ..ReviewState::new_at(late)
        };
        let next = update_review_state(q(5), &state, late);
        assert_eq!(next.next_review_date, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn quality_four_keeps_easiness() {
        let next = update_review_state(q(4), &ReviewState::new_at(now()), now());
        assert!((next.easiness_factor - 2.5).abs() < 1e-9);
    }

    #[test]
    fn history_and_counter_grow() {
        let first = update_review_state(q(4), &ReviewState::new_at(now()), now());
        let second = update_review_state(q(1), &first, now());
        assert_eq!(second.quality_history, vec![4, 1]);
        assert_eq!(second.total_reviews, 2);
    }

    #[test]
    fn quality_from_answer_uses_thresholds() {
        let thresholds = QualityThresholds::default();
        assert_eq!(quality_from_answer(true, 4.0, &thresholds).value(), 5);
        assert_eq!(quality_from_answer(true, 12.0, &thresholds).value(), 4);
        assert_eq!(quality_from_answer(false, 1.5, &thresholds).value(), 1);
        assert_eq!(quality_from_answer(false, 8.0, &thresholds).value(), 2);

        let strict = QualityThresholds {
            fast_answer_secs: 2.0,
            guess_secs: 0.5,
        };
        assert_eq!(quality_from_answer(true, 4.0, &strict).value(), 4);
        assert_eq!(quality_from_answer(false, 1.5, &strict).value(), 2);
    }

    #[test]
    fn quality_rejects_out_of_range() {
        assert!(Quality::try_from(6).is_err());
        assert!(Quality::try_from(-1).is_err());
        assert_eq!(Quality::try_from(3).unwrap().value(), 3);
    }
}
