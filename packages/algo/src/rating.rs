//! Rating Model
//!
//! Simplified ELO update used for every calibration attempt. The learner is
//! the only side that moves; item difficulty is fixed.

use serde::{Deserialize, Serialize};

use crate::types::{K_FACTOR, LOGISTIC_SCALE};

/// Result of scoring one attempt against the learner's standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingUpdate {
    pub before: i32,
    pub after: i32,
    pub delta: i32,
}

impl RatingUpdate {
    /// Saturates at the `i32` bounds; `delta` always equals `after - before`.
    pub fn apply(learner_rating: i32, item_rating: i32, correct: bool) -> Self {
        let delta = compute_delta(learner_rating, item_rating, correct);
        let after = learner_rating.saturating_add(delta);
        Self {
            before: learner_rating,
            after,
            delta: after - learner_rating,
        }
    }
}

/// Probability that a learner at `learner_rating` answers an item at
/// `item_rating` correctly.
pub fn expected_score(learner_rating: i32, item_rating: i32) -> f64 {
    let gap = f64::from(item_rating) - f64::from(learner_rating);
    1.0 / (1.0 + 10f64.powf(gap / LOGISTIC_SCALE))
}

/// Signed rating change for one attempt.
///
/// Rounds half up (`floor(x + 0.5)`), then forces a zero result to `+1` or
/// `-1` so that every attempt moves the rating in the direction of its
/// outcome.
pub fn compute_delta(learner_rating: i32, item_rating: i32, correct: bool) -> i32 {
    let expected = expected_score(learner_rating, item_rating);
    let outcome = if correct { 1.0 } else { 0.0 };
    let raw = K_FACTOR * (outcome - expected);
    let delta = (raw + 0.5).floor() as i32;

    if delta == 0 {
        return if correct { 1 } else { -1 };
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_score_equal_ratings() {
        assert!((expected_score(200, 200) - 0.5).abs() < 1e-12);
        assert!((expected_score(1500, 1500) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_expected_score_one_scale_gap() {
        let p = expected_score(200, 600);
        assert!((p - 1.0 / 11.0).abs() < 1e-12);
        assert!((expected_score(600, 200) - 10.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_apply_saturates_at_bounds() {
        let top = RatingUpdate::apply(i32::MAX, 0, true);
        assert_eq!(top.after, i32::MAX);
        assert_eq!(top.delta, 0);

        let near_top = RatingUpdate::apply(i32::MAX - 1, i32::MAX - 1, true);
        assert_eq!(near_top.after, i32::MAX);
        assert_eq!(near_top.delta, 1);

        let bottom = RatingUpdate::apply(i32::MIN, 0, false);
        assert_eq!(bottom.after, i32::MIN);
        assert_eq!(bottom.after - bottom.before, bottom.delta);
    }

    #[test]
    fn test_delta_even_match_correct() {
        assert_eq!(compute_delta(200, 200, true), 16);
        assert_eq!(RatingUpdate::apply(200, 200, true).after, 216);
    }

    #[test]
    fn test_delta_hard_item_correct() {
        assert_eq!(compute_delta(200, 600, true), 29);
        assert_eq!(RatingUpdate::apply(200, 600, true).after, 229);
    }

    #[test]
    fn test_delta_even_match_incorrect() {
        assert_eq!(compute_delta(1000, 1000, false), -16);
        assert_eq!(RatingUpdate::apply(1000, 1000, false).after, 984);
    }

    #[test]
    fn test_delta_never_zero() {
        // a huge gap rounds to zero before the floor kicks in
        assert_eq!(compute_delta(3000, 200, true), 1);
        assert_eq!(compute_delta(200, 3000, false), -1);
    }

    #[test]
    fn test_delta_bounded_by_k() {
        for gap in (-2000..=2000).step_by(50) {
            let up = compute_delta(1000, 1000 + gap, true);
            let down = compute_delta(1000, 1000 + gap, false);
            assert!((1..=32).contains(&up), "gap {gap}: {up}");
            assert!((-32..=-1).contains(&down), "gap {gap}: {down}");
        }
    }

    #[test]
    fn test_update_keeps_before_after_consistent() {
        let update = RatingUpdate::apply(850, 910, false);
        assert_eq!(update.before, 850);
        assert_eq!(update.after - update.before, update.delta);
    }
}
