use serde::Serialize;

use crate::db::models::Standing;
use crate::db::{CalibrationStore, StoreError};
use crate::services::calibration::CalibrationError;

/// Returns the learner's standing in a skill unit, creating it at
/// `initial_rating` on first contact.
///
/// Concurrent first contacts race on the `(userId, archetypeId)` uniqueness
/// constraint; the losers read back the winner's row.
pub async fn ensure_standing<S: CalibrationStore>(
    store: &S,
    learner_id: &str,
    skill_unit_id: &str,
    initial_rating: i32,
) -> Result<Standing, CalibrationError> {
    if let Some(standing) = store.find_standing(learner_id, skill_unit_id).await? {
        return Ok(standing);
    }

    if store
        .insert_standing_if_absent(learner_id, skill_unit_id, initial_rating)
        .await?
    {
        tracing::debug!(
            learner_id,
            skill_unit_id,
            rating = initial_rating,
            "standing cold-started"
        );
    }

    store
        .find_standing(learner_id, skill_unit_id)
        .await?
        .ok_or_else(|| {
            CalibrationError::Store(StoreError::Corrupt(format!(
                "standing for {learner_id}/{skill_unit_id} missing after cold start"
            )))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentOutcome {
    pub created_count: u64,
    pub enrolled_count: usize,
}

/// Bulk cold start over every skill unit of a domain. Re-running it for an
/// enrolled learner creates nothing.
pub async fn enroll_domain<S: CalibrationStore>(
    store: &S,
    learner_id: &str,
    domain_id: &str,
    initial_rating: i32,
) -> Result<EnrollmentOutcome, CalibrationError> {
    let units = store.list_skill_units(domain_id).await?;
    if units.is_empty() {
        return Err(CalibrationError::NotFound("skill units for domain"));
    }

    let ids: Vec<String> = units.into_iter().map(|unit| unit.id).collect();
    let created_count = store
        .insert_standings_if_absent(learner_id, &ids, initial_rating)
        .await?;

    tracing::info!(
        learner_id,
        domain_id,
        created = created_count,
        total = ids.len(),
        "domain enrollment"
    );

    Ok(EnrollmentOutcome {
        created_count,
        enrolled_count: ids.len(),
    })
}
