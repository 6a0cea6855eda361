use std::future::Future;

use crate::db::models::{
    AttemptCommit, CommittedAttempt, Domain, Item, ItemCandidate, RatingEvent, RatingOverride,
    SessionRecord, SkillUnit, Standing, Subject, SubjectRating,
};
use crate::db::postgres::PgStore;
use crate::db::sqlite_primary::SqliteStore;
use crate::db::StoreError;

/// Storage operations the calibration engine depends on.
///
/// Implementations own every uniqueness and transaction guarantee: the
/// engine never holds locks of its own. `commit_attempt` and
/// `commit_override` must be all-or-nothing, and must report
/// [`StoreError::Duplicate`] for a uniqueness violation and
/// [`StoreError::StaleStanding`] when the standing's version moved.
pub trait CalibrationStore: Send + Sync + 'static {
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All subjects, in authoring order.
    fn list_subjects(&self) -> impl Future<Output = Result<Vec<Subject>, StoreError>> + Send;

    fn find_subject_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Subject>, StoreError>> + Send;

    /// Per-subject maximum of the learner's standings.
    fn subject_ratings(
        &self,
        learner_id: &str,
    ) -> impl Future<Output = Result<Vec<SubjectRating>, StoreError>> + Send;

    /// Domains of a subject, in authoring order.
    fn list_domains(
        &self,
        subject_id: &str,
    ) -> impl Future<Output = Result<Vec<Domain>, StoreError>> + Send;

    fn find_domain_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Domain>, StoreError>> + Send;

    /// Every skill unit below a subject, across all of its domains.
    fn list_subject_skill_units(
        &self,
        subject_id: &str,
    ) -> impl Future<Output = Result<Vec<SkillUnit>, StoreError>> + Send;

    fn find_skill_unit_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<SkillUnit>, StoreError>> + Send;

    /// Skill units of a domain, in authoring order.
    fn list_skill_units(
        &self,
        domain_id: &str,
    ) -> impl Future<Output = Result<Vec<SkillUnit>, StoreError>> + Send;

    fn find_item(
        &self,
        item_id: &str,
    ) -> impl Future<Output = Result<Option<Item>, StoreError>> + Send;

    /// Items of the skill unit the learner has never attempted.
    fn unattempted_candidates(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
    ) -> impl Future<Output = Result<Vec<ItemCandidate>, StoreError>> + Send;

    fn attempt_exists(
        &self,
        learner_id: &str,
        item_id: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn find_standing(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
    ) -> impl Future<Output = Result<Option<Standing>, StoreError>> + Send;

    fn list_standings(
        &self,
        learner_id: &str,
        skill_unit_ids: &[String],
    ) -> impl Future<Output = Result<Vec<Standing>, StoreError>> + Send;

    /// Inserts a fresh standing unless one exists. Returns whether this call
    /// created it.
    fn insert_standing_if_absent(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
        initial_rating: i32,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Bulk form of [`CalibrationStore::insert_standing_if_absent`], in one
    /// transaction. Returns the number of rows created.
    fn insert_standings_if_absent(
        &self,
        learner_id: &str,
        skill_unit_ids: &[String],
        initial_rating: i32,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn commit_attempt(
        &self,
        commit: &AttemptCommit,
    ) -> impl Future<Output = Result<CommittedAttempt, StoreError>> + Send;

    fn commit_override(
        &self,
        change: &RatingOverride,
    ) -> impl Future<Output = Result<(Standing, RatingEvent), StoreError>> + Send;

    /// Newest first.
    fn rating_events(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<RatingEvent>, StoreError>> + Send;

    fn find_session(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<Option<SessionRecord>, StoreError>> + Send;
}

/// Store selected at start-up.
#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub async fn close(&self) {
        match self {
            Store::Postgres(store) => store.pool().close().await,
            Store::Sqlite(store) => store.pool().close().await,
        }
    }
}

impl CalibrationStore for Store {
    async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Store::Postgres(s) => s.ping().await,
            Store::Sqlite(s) => s.ping().await,
        }
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        match self {
            Store::Postgres(s) => s.list_subjects().await,
            Store::Sqlite(s) => s.list_subjects().await,
        }
    }

    async fn find_subject_by_slug(&self, slug: &str) -> Result<Option<Subject>, StoreError> {
        match self {
            Store::Postgres(s) => s.find_subject_by_slug(slug).await,
            Store::Sqlite(s) => s.find_subject_by_slug(slug).await,
        }
    }

    async fn subject_ratings(&self, learner_id: &str) -> Result<Vec<SubjectRating>, StoreError> {
        match self {
            Store::Postgres(s) => s.subject_ratings(learner_id).await,
            Store::Sqlite(s) => s.subject_ratings(learner_id).await,
        }
    }

    async fn list_domains(&self, subject_id: &str) -> Result<Vec<Domain>, StoreError> {
        match self {
            Store::Postgres(s) => s.list_domains(subject_id).await,
            Store::Sqlite(s) => s.list_domains(subject_id).await,
        }
    }

    async fn find_domain_by_slug(&self, slug: &str) -> Result<Option<Domain>, StoreError> {
        match self {
            Store::Postgres(s) => s.find_domain_by_slug(slug).await,
            Store::Sqlite(s) => s.find_domain_by_slug(slug).await,
        }
    }

    async fn list_subject_skill_units(
        &self,
        subject_id: &str,
    ) -> Result<Vec<SkillUnit>, StoreError> {
        match self {
            Store::Postgres(s) => s.list_subject_skill_units(subject_id).await,
            Store::Sqlite(s) => s.list_subject_skill_units(subject_id).await,
        }
    }

    async fn find_skill_unit_by_slug(&self, slug: &str) -> Result<Option<SkillUnit>, StoreError> {
        match self {
            Store::Postgres(s) => s.find_skill_unit_by_slug(slug).await,
            Store::Sqlite(s) => s.find_skill_unit_by_slug(slug).await,
        }
    }

    async fn list_skill_units(&self, domain_id: &str) -> Result<Vec<SkillUnit>, StoreError> {
        match self {
            Store::Postgres(s) => s.list_skill_units(domain_id).await,
            Store::Sqlite(s) => s.list_skill_units(domain_id).await,
        }
    }

    async fn find_item(&self, item_id: &str) -> Result<Option<Item>, StoreError> {
        match self {
            Store::Postgres(s) => s.find_item(item_id).await,
            Store::Sqlite(s) => s.find_item(item_id).await,
        }
    }

    async fn unattempted_candidates(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
    ) -> Result<Vec<ItemCandidate>, StoreError> {
        match self {
            Store::Postgres(s) => s.unattempted_candidates(learner_id, skill_unit_id).await,
            Store::Sqlite(s) => s.unattempted_candidates(learner_id, skill_unit_id).await,
        }
    }

    async fn attempt_exists(&self, learner_id: &str, item_id: &str) -> Result<bool, StoreError> {
        match self {
            Store::Postgres(s) => s.attempt_exists(learner_id, item_id).await,
            Store::Sqlite(s) => s.attempt_exists(learner_id, item_id).await,
        }
    }

    async fn find_standing(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
    ) -> Result<Option<Standing>, StoreError> {
        match self {
            Store::Postgres(s) => s.find_standing(learner_id, skill_unit_id).await,
            Store::Sqlite(s) => s.find_standing(learner_id, skill_unit_id).await,
        }
    }

    async fn list_standings(
        &self,
        learner_id: &str,
        skill_unit_ids: &[String],
    ) -> Result<Vec<Standing>, StoreError> {
        match self {
            Store::Postgres(s) => s.list_standings(learner_id, skill_unit_ids).await,
            Store::Sqlite(s) => s.list_standings(learner_id, skill_unit_ids).await,
        }
    }

    async fn insert_standing_if_absent(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
        initial_rating: i32,
    ) -> Result<bool, StoreError> {
        match self {
            Store::Postgres(s) => {
                s.insert_standing_if_absent(learner_id, skill_unit_id, initial_rating)
                    .await
            }
            Store::Sqlite(s) => {
                s.insert_standing_if_absent(learner_id, skill_unit_id, initial_rating)
                    .await
            }
        }
    }

    async fn insert_standings_if_absent(
        &self,
        learner_id: &str,
        skill_unit_ids: &[String],
        initial_rating: i32,
    ) -> Result<u64, StoreError> {
        match self {
            Store::Postgres(s) => {
                s.insert_standings_if_absent(learner_id, skill_unit_ids, initial_rating)
                    .await
            }
            Store::Sqlite(s) => {
                s.insert_standings_if_absent(learner_id, skill_unit_ids, initial_rating)
                    .await
            }
        }
    }

    async fn commit_attempt(&self, commit: &AttemptCommit) -> Result<CommittedAttempt, StoreError> {
        match self {
            Store::Postgres(s) => s.commit_attempt(commit).await,
            Store::Sqlite(s) => s.commit_attempt(commit).await,
        }
    }

    async fn commit_override(
        &self,
        change: &RatingOverride,
    ) -> Result<(Standing, RatingEvent), StoreError> {
        match self {
            Store::Postgres(s) => s.commit_override(change).await,
            Store::Sqlite(s) => s.commit_override(change).await,
        }
    }

    async fn rating_events(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
        limit: i64,
    ) -> Result<Vec<RatingEvent>, StoreError> {
        match self {
            Store::Postgres(s) => s.rating_events(learner_id, skill_unit_id, limit).await,
            Store::Sqlite(s) => s.rating_events(learner_id, skill_unit_id, limit).await,
        }
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, StoreError> {
        match self {
            Store::Postgres(s) => s.find_session(token_hash).await,
            Store::Sqlite(s) => s.find_session(token_hash).await,
        }
    }
}
