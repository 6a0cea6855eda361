//! Attempt ledger: scores submissions at most once per (learner, item) and
//! keeps standings, attempts and rating events in step.

use std::ops::RangeInclusive;

use calibra_algo::RatingUpdate;
use serde::Serialize;

use crate::db::models::{
    AttemptCommit, CommittedAttempt, ItemOwner, RatingEvent, RatingOverride, Standing,
};
use crate::db::{CalibrationStore, StoreError};
use crate::services::calibration::CalibrationError;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 200;
/// Ratings an administrator may set directly.
pub const OVERRIDE_RATING_RANGE: RangeInclusive<i32> = 0..=10_000;

#[derive(Debug, Clone)]
pub struct SubmitAnswer {
    pub item_id: String,
    pub chosen: String,
    pub time_ms: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub correct: bool,
    pub new_rating: i32,
    pub delta: i32,
}

impl From<&CommittedAttempt> for SubmissionOutcome {
    fn from(committed: &CommittedAttempt) -> Self {
        Self {
            correct: committed.attempt.correct,
            new_rating: committed.event.after,
            delta: committed.event.delta,
        }
    }
}

/// Scores one answer and commits attempt, rating event and standing in a
/// single transaction.
///
/// The `attempt_exists` pre-check only saves a transaction; the unique index on
/// `(userId, problemId)` is what turns a concurrent duplicate into
/// `Conflict`. A lost version race on the standing re-reads it and scores
/// again, at most `commit_retries` times.
pub async fn submit_attempt<S: CalibrationStore>(
    store: &S,
    learner_id: &str,
    answer: &SubmitAnswer,
    commit_retries: u32,
) -> Result<CommittedAttempt, CalibrationError> {
    let item = store
        .find_item(&answer.item_id)
        .await?
        .ok_or(CalibrationError::NotFound("problem"))?;
    let skill_unit_id = match &item.owner {
        ItemOwner::SkillUnit(id) => id.clone(),
        ItemOwner::Unowned => return Err(CalibrationError::NotFound("problem context")),
    };

    let mut retries_left = commit_retries;
    loop {
        let standing = store
            .find_standing(learner_id, &skill_unit_id)
            .await?
            .ok_or(CalibrationError::Forbidden)?;

        if store.attempt_exists(learner_id, &item.id).await? {
            return Err(CalibrationError::Conflict);
        }

        let correct = item.kind.score(&item.correct_answer, &answer.chosen);
        let update = RatingUpdate::apply(standing.rating, item.rating, correct);
        let commit = AttemptCommit {
            learner_id: learner_id.to_string(),
            item_id: item.id.clone(),
            standing_id: standing.id.clone(),
            skill_unit_id: skill_unit_id.clone(),
            expected_version: standing.version,
            chosen: answer.chosen.clone(),
            correct,
            time_ms: answer.time_ms.max(0),
            update,
        };

        match store.commit_attempt(&commit).await {
            Ok(committed) => {
                tracing::info!(
                    learner_id,
                    item_id = %item.id,
                    correct,
                    before = update.before,
                    after = update.after,
                    "attempt recorded"
                );
                return Ok(committed);
            }
            Err(StoreError::StaleStanding) if retries_left > 0 => {
                retries_left -= 1;
                tracing::debug!(learner_id, item_id = %item.id, "standing moved, rescoring");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Administrative rating change, logged as `PIPELINE_MANUAL_ADJUSTMENT`.
/// Leaves the attempt count alone.
pub async fn override_rating<S: CalibrationStore>(
    store: &S,
    learner_id: &str,
    skill_unit_id: &str,
    rating: i32,
    commit_retries: u32,
) -> Result<(Standing, RatingEvent), CalibrationError> {
    if !OVERRIDE_RATING_RANGE.contains(&rating) {
        return Err(CalibrationError::InvalidInput(format!(
            "rating must be between {} and {}",
            OVERRIDE_RATING_RANGE.start(),
            OVERRIDE_RATING_RANGE.end()
        )));
    }

    let mut retries_left = commit_retries;
    loop {
        let standing = store
            .find_standing(learner_id, skill_unit_id)
            .await?
            .ok_or(CalibrationError::NotFound("standing"))?;

        let change = RatingOverride {
            standing_id: standing.id.clone(),
            learner_id: learner_id.to_string(),
            skill_unit_id: skill_unit_id.to_string(),
            expected_version: standing.version,
            before: standing.rating,
            after: rating,
        };

        match store.commit_override(&change).await {
            Ok(result) => {
                tracing::info!(
                    learner_id,
                    skill_unit_id,
                    before = change.before,
                    after = change.after,
                    "rating overridden"
                );
                return Ok(result);
            }
            Err(StoreError::StaleStanding) if retries_left > 0 => retries_left -= 1,
            Err(err) => return Err(err.into()),
        }
    }
}

pub fn clamp_history_limit(limit: Option<i64>) -> i64 {
    limit
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT)
}

pub async fn rating_history<S: CalibrationStore>(
    store: &S,
    learner_id: &str,
    skill_unit_id: &str,
    limit: Option<i64>,
) -> Result<Vec<RatingEvent>, CalibrationError> {
    let events = store
        .rating_events(learner_id, skill_unit_id, clamp_history_limit(limit))
        .await?;
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_history_limit() {
        assert_eq!(clamp_history_limit(None), 50);
        assert_eq!(clamp_history_limit(Some(0)), 50);
        assert_eq!(clamp_history_limit(Some(-3)), 50);
        assert_eq!(clamp_history_limit(Some(10)), 10);
        assert_eq!(clamp_history_limit(Some(5000)), 200);
    }
}
