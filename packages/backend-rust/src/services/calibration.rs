//! Calibration session: the two learner-facing operations (fetch next
//! problem, submit answer) plus the enrollment, history and override paths
//! that share the same store.

use std::future::Future;

use thiserror::Error;

use crate::config::CalibrationSettings;
use crate::db::models::{RatingEvent, SkillUnit, Standing, Subject};
use crate::db::{CalibrationStore, StoreError};
use crate::services::item_view::ProblemView;
use crate::services::ledger::{self, SubmissionOutcome, SubmitAnswer};
use crate::services::selection::select_item;
use crate::services::standing::{self, EnrollmentOutcome};
use crate::services::world::{self, DomainDetail, WorldDetail, WorldList};

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Enrollment required for this skill unit")]
    Forbidden,
    #[error("Attempt already recorded for this problem")]
    Conflict,
    #[error("No unattempted problems remain in this skill unit")]
    NoItemsAvailable,
    #[error("{0}")]
    InvalidInput(String),
    #[error("store failure: {0}")]
    Store(#[source] StoreError),
}

impl CalibrationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CalibrationError::Store(err) if err.is_retryable())
    }
}

impl From<StoreError> for CalibrationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => CalibrationError::Conflict,
            other => CalibrationError::Store(other),
        }
    }
}

/// Engine entry point. Holds the injected store and nothing else mutable.
pub struct CalibrationSession<S> {
    store: S,
    settings: CalibrationSettings,
}

impl<S: CalibrationStore> CalibrationSession<S> {
    pub fn new(store: S, settings: CalibrationSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> CalibrationSettings {
        self.settings
    }

    async fn skill_unit_by_slug(&self, slug: &str) -> Result<SkillUnit, CalibrationError> {
        self.store
            .find_skill_unit_by_slug(slug)
            .await?
            .ok_or(CalibrationError::NotFound("archetype"))
    }

    /// Fetches the next unseen problem, cold-starting the standing if the
    /// learner has none for this skill unit yet.
    pub async fn next_problem(
        &self,
        learner_id: &str,
        skill_unit_slug: &str,
    ) -> Result<ProblemView, CalibrationError> {
        let settings = self.settings;
        retry_transient("next_problem", move || async move {
            let unit = self.skill_unit_by_slug(skill_unit_slug).await?;
            let selection = select_item(
                &self.store,
                learner_id,
                &unit,
                settings.initial_rating,
                settings.band_radius,
            )
            .await?;
            Ok(ProblemView::new(
                &selection.item,
                selection.standing.rating,
                selection.standing.attempt_count,
            ))
        })
        .await
    }

    pub async fn submit(
        &self,
        learner_id: &str,
        answer: &SubmitAnswer,
    ) -> Result<SubmissionOutcome, CalibrationError> {
        let retries = self.settings.commit_retries;
        let store = &self.store;
        retry_transient("submit", move || async move {
            let committed = ledger::submit_attempt(store, learner_id, answer, retries).await?;
            Ok(SubmissionOutcome::from(&committed))
        })
        .await
    }

    pub async fn enroll(
        &self,
        learner_id: &str,
        domain_id: &str,
    ) -> Result<EnrollmentOutcome, CalibrationError> {
        let initial = self.settings.initial_rating;
        let store = &self.store;
        retry_transient("enroll", move || {
            standing::enroll_domain(store, learner_id, domain_id, initial)
        })
        .await
    }

    pub async fn ensure_standing(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
    ) -> Result<Standing, CalibrationError> {
        standing::ensure_standing(
            &self.store,
            learner_id,
            skill_unit_id,
            self.settings.initial_rating,
        )
        .await
    }

    async fn subject_by_slug(&self, slug: &str) -> Result<Subject, CalibrationError> {
        self.store
            .find_subject_by_slug(slug)
            .await?
            .ok_or(CalibrationError::NotFound("realm"))
    }

    pub async fn worlds(&self, learner_id: &str) -> Result<WorldList, CalibrationError> {
        let subjects = self.store.list_subjects().await?;
        let ratings = self.store.subject_ratings(learner_id).await?;
        Ok(world::world_list(subjects, &ratings))
    }

    pub async fn world_detail(
        &self,
        learner_id: &str,
        subject_slug: &str,
    ) -> Result<WorldDetail, CalibrationError> {
        let subject = self.subject_by_slug(subject_slug).await?;
        let domains = self.store.list_domains(&subject.id).await?;
        let units = self.store.list_subject_skill_units(&subject.id).await?;
        let ids: Vec<String> = units.iter().map(|unit| unit.id.clone()).collect();
        let standings = self.store.list_standings(learner_id, &ids).await?;
        Ok(world::world_detail(subject, domains, &units, &standings))
    }

    /// Domain detail, scoped to the subject it must belong to.
    pub async fn domain_detail(
        &self,
        learner_id: &str,
        subject_slug: &str,
        domain_slug: &str,
    ) -> Result<DomainDetail, CalibrationError> {
        let subject = self.subject_by_slug(subject_slug).await?;
        let domain = self
            .store
            .find_domain_by_slug(domain_slug)
            .await?
            .filter(|domain| domain.subject_id == subject.id)
            .ok_or(CalibrationError::NotFound("domain"))?;
        let units = self.store.list_skill_units(&domain.id).await?;
        let ids: Vec<String> = units.iter().map(|unit| unit.id.clone()).collect();
        let standings = self.store.list_standings(learner_id, &ids).await?;
        Ok(world::domain_detail(domain, units, &standings))
    }

    pub async fn rating_history(
        &self,
        learner_id: &str,
        skill_unit_slug: &str,
        limit: Option<i64>,
    ) -> Result<Vec<RatingEvent>, CalibrationError> {
        let unit = self.skill_unit_by_slug(skill_unit_slug).await?;
        ledger::rating_history(&self.store, learner_id, &unit.id, limit).await
    }

    pub async fn override_rating(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
        rating: i32,
    ) -> Result<(Standing, RatingEvent), CalibrationError> {
        ledger::override_rating(
            &self.store,
            learner_id,
            skill_unit_id,
            rating,
            self.settings.commit_retries,
        )
        .await
    }
}

/// Runs `op` and, on a transient store failure, exactly once more.
async fn retry_transient<T, F, Fut>(name: &'static str, mut op: F) -> Result<T, CalibrationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CalibrationError>>,
{
    match op().await {
        Err(err) if err.is_transient() => {
            tracing::warn!(operation = name, error = %err, "transient store failure, retrying");
            op().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retry_transient_retries_once() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry_transient("t", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(CalibrationError::Store(StoreError::StaleStanding)) }
        })
        .await;
        assert!(matches!(result, Err(CalibrationError::Store(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_transient_leaves_business_errors_alone() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry_transient("t", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(CalibrationError::Conflict) }
        })
        .await;
        assert!(matches!(result, Err(CalibrationError::Conflict)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_maps_to_conflict() {
        assert!(matches!(
            CalibrationError::from(StoreError::Duplicate),
            CalibrationError::Conflict
        ));
        assert!(!CalibrationError::from(StoreError::Corrupt("x".into())).is_transient());
    }
}
