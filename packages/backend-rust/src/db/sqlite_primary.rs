use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::db::models::{
    Attempt, AttemptCommit, CommittedAttempt, Domain, Item, ItemCandidate, ItemRow, RatingEvent,
    RatingOverride, RatingReason, SessionRecord, SkillUnit, Standing, Subject, SubjectRating,
};
use crate::db::sqlite_schema::{split_sql_statements, SQLITE_SCHEMA_SQL, SQLITE_SCHEMA_VERSION};
use crate::db::store::CalibrationStore;
use crate::db::StoreError;

const SUBJECT_COLUMNS: &str = r#""id","slug","title","summary","order""#;
const DOMAIN_COLUMNS: &str = r#""id","subjectId","slug","title","summary","order""#;
const SKILL_UNIT_COLUMNS: &str =
    r#""id","domainId","slug","title","summary","eloMin","eloMax","order""#;
const ITEM_SELECT: &str = r#"
    SELECT p."id", p."archetypeId", p."type", p."rating", p."correctChoice", p."promptLatex",
           p."choices", p."tags", p."topic", p."solutions", s."order" AS "subjectOrder"
    FROM "problems" p
    LEFT JOIN "archetypes" a ON a."id" = p."archetypeId"
    LEFT JOIN "domains" d ON d."id" = a."domainId"
    LEFT JOIN "subjects" s ON s."id" = d."subjectId"
"#;
const STANDING_COLUMNS: &str =
    r#""id","userId","archetypeId","rating","attemptCount","version","lastPlayedAt""#;
const EVENT_COLUMNS: &str =
    r#""id","userId","archetypeId","problemId","before","after","delta","reason","createdAt""#;

/// Opens (creating if needed) the desktop database at `path` and brings its
/// schema up to date.
pub async fn init_sqlite_pool(path: &Path) -> Result<SqlitePool, SqliteInitError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SqliteInitError::Io(e.to_string()))?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());
    let options = SqliteConnectOptions::from_str(&db_url)
        .map_err(|e| SqliteInitError::Config(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_sqlite_migrations(&pool).await?;

    Ok(pool)
}

async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    let has_metadata: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_db_metadata')",
    )
    .fetch_one(pool)
    .await?;

    if has_metadata {
        let version: Option<String> = sqlx::query_scalar(
            r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#,
        )
        .fetch_optional(pool)
        .await?;
        if version.as_deref() == Some(SQLITE_SCHEMA_VERSION) {
            return Ok(());
        }
    }

    tracing::info!(version = SQLITE_SCHEMA_VERSION, "applying sqlite schema");

    let mut tx = pool.begin().await?;
    for stmt in split_sql_statements(SQLITE_SCHEMA_SQL) {
        sqlx::query(&stmt).execute(&mut *tx).await?;
    }
    sqlx::query(
        r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?1)"#,
    )
    .bind(SQLITE_SCHEMA_VERSION)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SqliteInitError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl CalibrationStore for SqliteStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        let sql = format!(r#"SELECT {SUBJECT_COLUMNS} FROM "subjects" ORDER BY "order" ASC, "title" ASC"#);
        let subjects = sqlx::query_as::<_, Subject>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(subjects)
    }

    async fn find_subject_by_slug(&self, slug: &str) -> Result<Option<Subject>, StoreError> {
        let sql = format!(r#"SELECT {SUBJECT_COLUMNS} FROM "subjects" WHERE "slug" = ?1"#);
        let subject = sqlx::query_as::<_, Subject>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(subject)
    }

    async fn subject_ratings(&self, learner_id: &str) -> Result<Vec<SubjectRating>, StoreError> {
        let ratings = sqlx::query_as::<_, SubjectRating>(
            r#"
            SELECT d."subjectId" AS "subjectId", MAX(ua."rating") AS "rating"
            FROM "user_archetypes" ua
            JOIN "archetypes" a ON a."id" = ua."archetypeId"
            JOIN "domains" d ON d."id" = a."domainId"
            WHERE ua."userId" = ?1
            GROUP BY d."subjectId"
            "#,
        )
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn list_domains(&self, subject_id: &str) -> Result<Vec<Domain>, StoreError> {
        let sql = format!(
            r#"SELECT {DOMAIN_COLUMNS} FROM "domains" WHERE "subjectId" = ?1 ORDER BY "order" ASC, "id" ASC"#
        );
        let domains = sqlx::query_as::<_, Domain>(&sql)
            .bind(subject_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(domains)
    }

    async fn find_domain_by_slug(&self, slug: &str) -> Result<Option<Domain>, StoreError> {
        let sql = format!(r#"SELECT {DOMAIN_COLUMNS} FROM "domains" WHERE "slug" = ?1"#);
        let domain = sqlx::query_as::<_, Domain>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(domain)
    }

    async fn list_subject_skill_units(
        &self,
        subject_id: &str,
    ) -> Result<Vec<SkillUnit>, StoreError> {
        let units = sqlx::query_as::<_, SkillUnit>(
            r#"
            SELECT a."id", a."domainId", a."slug", a."title", a."summary",
                   a."eloMin", a."eloMax", a."order"
            FROM "archetypes" a
            JOIN "domains" d ON d."id" = a."domainId"
            WHERE d."subjectId" = ?1
            ORDER BY d."order" ASC, a."order" ASC, a."id" ASC
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(units)
    }

    async fn find_skill_unit_by_slug(&self, slug: &str) -> Result<Option<SkillUnit>, StoreError> {
        let sql = format!(r#"SELECT {SKILL_UNIT_COLUMNS} FROM "archetypes" WHERE "slug" = ?1"#);
        let unit = sqlx::query_as::<_, SkillUnit>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(unit)
    }

    async fn list_skill_units(&self, domain_id: &str) -> Result<Vec<SkillUnit>, StoreError> {
        let sql = format!(
            r#"SELECT {SKILL_UNIT_COLUMNS} FROM "archetypes" WHERE "domainId" = ?1 ORDER BY "order" ASC, "id" ASC"#
        );
        let units = sqlx::query_as::<_, SkillUnit>(&sql)
            .bind(domain_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(units)
    }

    async fn find_item(&self, item_id: &str) -> Result<Option<Item>, StoreError> {
        let sql = format!(r#"{ITEM_SELECT} WHERE p."id" = ?1"#);
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Item::try_from).transpose()
    }

    async fn unattempted_candidates(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
    ) -> Result<Vec<ItemCandidate>, StoreError> {
        let candidates = sqlx::query_as::<_, ItemCandidate>(
            r#"
            SELECT p."id", p."rating"
            FROM "problems" p
            WHERE p."archetypeId" = ?1
              AND NOT EXISTS (
                SELECT 1 FROM "attempts" a
                WHERE a."problemId" = p."id" AND a."userId" = ?2
              )
            "#,
        )
        .bind(skill_unit_id)
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(candidates)
    }

    async fn attempt_exists(&self, learner_id: &str, item_id: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM "attempts" WHERE "userId" = ?1 AND "problemId" = ?2)"#,
        )
        .bind(learner_id)
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_standing(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
    ) -> Result<Option<Standing>, StoreError> {
        let sql = format!(
            r#"SELECT {STANDING_COLUMNS} FROM "user_archetypes" WHERE "userId" = ?1 AND "archetypeId" = ?2"#
        );
        let standing = sqlx::query_as::<_, Standing>(&sql)
            .bind(learner_id)
            .bind(skill_unit_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(standing)
    }

    async fn list_standings(
        &self,
        learner_id: &str,
        skill_unit_ids: &[String],
    ) -> Result<Vec<Standing>, StoreError> {
        if skill_unit_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            r#"SELECT {STANDING_COLUMNS} FROM "user_archetypes" WHERE "userId" = "#
        ));
        qb.push_bind(learner_id);
        qb.push(r#" AND "archetypeId" IN ("#);
        let mut ids = qb.separated(", ");
        for id in skill_unit_ids {
            ids.push_bind(id.as_str());
        }
        ids.push_unseparated(")");

        let standings = qb
            .build_query_as::<Standing>()
            .fetch_all(&self.pool)
            .await?;
        Ok(standings)
    }

    async fn insert_standing_if_absent(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
        initial_rating: i32,
    ) -> Result<bool, StoreError> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            INSERT INTO "user_archetypes"
              ("id","userId","archetypeId","rating","attemptCount","version","createdAt","updatedAt")
            VALUES (?1,?2,?3,?4,0,0,?5,?5)
            ON CONFLICT ("userId","archetypeId") DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(learner_id)
        .bind(skill_unit_id)
        .bind(initial_rating)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_standings_if_absent(
        &self,
        learner_id: &str,
        skill_unit_ids: &[String],
        initial_rating: i32,
    ) -> Result<u64, StoreError> {
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;
        let mut created = 0;
        for skill_unit_id in skill_unit_ids {
            let result = sqlx::query(
                r#"
                INSERT INTO "user_archetypes"
                  ("id","userId","archetypeId","rating","attemptCount","version","createdAt","updatedAt")
                VALUES (?1,?2,?3,?4,0,0,?5,?5)
                ON CONFLICT ("userId","archetypeId") DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(learner_id)
            .bind(skill_unit_id)
            .bind(initial_rating)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            created += result.rows_affected();
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn commit_attempt(&self, commit: &AttemptCommit) -> Result<CommittedAttempt, StoreError> {
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        // Opening with a write takes the reserved lock up front, so a
        // concurrent submit waits on busy_timeout instead of failing its
        // read-to-write upgrade.
        let attempt = sqlx::query_as::<_, Attempt>(
            r#"
            INSERT INTO "attempts"
              ("id","userId","problemId","chosen","correct","timeMs","deltaUser","deltaProblem","createdAt")
            VALUES (?1,?2,?3,?4,?5,?6,?7,0,?8)
            RETURNING "id","userId","problemId","chosen","correct","timeMs","deltaUser","deltaProblem","createdAt"
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&commit.learner_id)
        .bind(&commit.item_id)
        .bind(&commit.chosen)
        .bind(commit.correct)
        .bind(commit.time_ms)
        .bind(commit.update.delta)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let event = insert_event(
            &mut tx,
            &commit.learner_id,
            &commit.skill_unit_id,
            Some(&commit.item_id),
            commit.update.before,
            commit.update.after,
            RatingReason::CalibrationAttempt,
        )
        .await?;

        let standing = apply_outcome(
            &mut tx,
            &commit.standing_id,
            commit.expected_version,
            commit.update.after,
            1,
        )
        .await?;

        tx.commit().await?;

        Ok(CommittedAttempt {
            attempt,
            event,
            standing,
        })
    }

    async fn commit_override(
        &self,
        change: &RatingOverride,
    ) -> Result<(Standing, RatingEvent), StoreError> {
        let mut tx = self.pool.begin().await?;

        let standing = apply_outcome(
            &mut tx,
            &change.standing_id,
            change.expected_version,
            change.after,
            0,
        )
        .await?;

        let event = insert_event(
            &mut tx,
            &change.learner_id,
            &change.skill_unit_id,
            None,
            change.before,
            change.after,
            RatingReason::PipelineManualAdjustment,
        )
        .await?;

        tx.commit().await?;
        Ok((standing, event))
    }

    async fn rating_events(
        &self,
        learner_id: &str,
        skill_unit_id: &str,
        limit: i64,
    ) -> Result<Vec<RatingEvent>, StoreError> {
        let sql = format!(
            r#"SELECT {EVENT_COLUMNS} FROM "rating_events"
               WHERE "userId" = ?1 AND "archetypeId" = ?2
               ORDER BY "rowid" DESC
               LIMIT ?3"#
        );
        let events = sqlx::query_as::<_, RatingEvent>(&sql)
            .bind(learner_id)
            .bind(skill_unit_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, StoreError> {
        let session = sqlx::query_as::<_, SessionRecord>(
            r#"SELECT "userId","expiresAt" FROM "sessions" WHERE "token" = ?1"#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }
}

async fn apply_outcome(
    tx: &mut Transaction<'_, Sqlite>,
    standing_id: &str,
    expected_version: i64,
    new_rating: i32,
    attempt_increment: i32,
) -> Result<Standing, StoreError> {
    let now = Utc::now().naive_utc();
    let last_played = (attempt_increment > 0).then_some(now);
    let sql = format!(
        r#"
        UPDATE "user_archetypes"
        SET "rating" = ?3,
            "attemptCount" = "attemptCount" + ?4,
            "lastPlayedAt" = COALESCE(?5, "lastPlayedAt"),
            "version" = "version" + 1,
            "updatedAt" = ?6
        WHERE "id" = ?1 AND "version" = ?2
        RETURNING {STANDING_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Standing>(&sql)
        .bind(standing_id)
        .bind(expected_version)
        .bind(new_rating)
        .bind(attempt_increment)
        .bind(last_played)
        .bind(now)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::StaleStanding)
}

async fn insert_event(
    tx: &mut Transaction<'_, Sqlite>,
    learner_id: &str,
    skill_unit_id: &str,
    item_id: Option<&str>,
    before: i32,
    after: i32,
    reason: RatingReason,
) -> Result<RatingEvent, StoreError> {
    let sql = format!(
        r#"
        INSERT INTO "rating_events"
          ("id","userId","archetypeId","problemId","before","after","delta","reason","createdAt")
        VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
        RETURNING {EVENT_COLUMNS}
        "#
    );
    let event = sqlx::query_as::<_, RatingEvent>(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(learner_id)
        .bind(skill_unit_id)
        .bind(item_id)
        .bind(before)
        .bind(after)
        .bind(after.saturating_sub(before))
        .bind(reason.as_str())
        .bind(Utc::now().naive_utc())
        .fetch_one(&mut **tx)
        .await?;
    Ok(event)
}
