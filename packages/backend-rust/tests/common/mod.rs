#![allow(dead_code)]

use axum::Router;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tempfile::TempDir;

use calibra_backend::auth::hash_token;
use calibra_backend::config::Config;
use calibra_backend::db::sqlite_primary::{init_sqlite_pool, SqliteStore};
use calibra_backend::db::Store;

pub const SUBJECT_ID: &str = "sub-math";
pub const SUBJECT_SLUG: &str = "mathematics";
pub const DOMAIN_ID: &str = "dom-algebra";
pub const DOMAIN_SLUG: &str = "algebra";
pub const UNIT_ID: &str = "arch-linear";
pub const UNIT_SLUG: &str = "linear-equations";

/// A file-backed SQLite store in WAL mode. Keep the `TempDir` alive for the
/// duration of the test.
pub struct TestDb {
    pub dir: TempDir,
    pub store: Store,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let pool = init_sqlite_pool(&dir.path().join("calibra.db"))
            .await
            .expect("sqlite init");
        Self {
            dir,
            store: Store::Sqlite(SqliteStore::new(pool)),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        match &self.store {
            Store::Sqlite(store) => store.pool(),
            Store::Postgres(_) => unreachable!("test store is sqlite"),
        }
    }

    pub fn config(&self) -> Config {
        Config::desktop(self.dir.path().join("calibra.db"))
    }

    pub async fn seed_subject(&self, id: &str, slug: &str, title: &str, order: i32) {
        sqlx::query(r#"INSERT INTO "subjects" ("id","slug","title","order") VALUES (?1,?2,?3,?4)"#)
            .bind(id)
            .bind(slug)
            .bind(title)
            .bind(order)
            .execute(self.pool())
            .await
            .expect("seed subject");
    }

    /// Domain under the default subject, which is created on first use.
    pub async fn seed_domain(&self, id: &str, slug: &str) {
        sqlx::query(
            r#"INSERT OR IGNORE INTO "subjects" ("id","slug","title","order") VALUES (?1,?2,'Mathematics',1)"#,
        )
        .bind(SUBJECT_ID)
        .bind(SUBJECT_SLUG)
        .execute(self.pool())
        .await
        .expect("seed default subject");
        self.seed_domain_in(id, SUBJECT_ID, slug, 0).await;
    }

    pub async fn seed_domain_in(&self, id: &str, subject_id: &str, slug: &str, order: i32) {
        sqlx::query(
            r#"INSERT INTO "domains" ("id","subjectId","slug","title","order") VALUES (?1,?2,?3,?4,?5)"#,
        )
        .bind(id)
        .bind(subject_id)
        .bind(slug)
        .bind(slug.to_uppercase())
        .bind(order)
        .execute(self.pool())
        .await
        .expect("seed domain");
    }

    pub async fn seed_skill_unit(&self, id: &str, domain_id: &str, slug: &str, order: i32) {
        sqlx::query(
            r#"INSERT INTO "archetypes" ("id","domainId","slug","title","order") VALUES (?1,?2,?3,?4,?5)"#,
        )
        .bind(id)
        .bind(domain_id)
        .bind(slug)
        .bind(slug.replace('-', " "))
        .bind(order)
        .execute(self.pool())
        .await
        .expect("seed skill unit");
    }

    /// MCQ item with choices A/B/C; `correct` is the right choice id.
    pub async fn seed_item(&self, id: &str, skill_unit_id: Option<&str>, rating: i32, correct: &str) {
        sqlx::query(
            r#"
            INSERT INTO "problems"
              ("id","archetypeId","type","rating","promptLatex","choices","correctChoice","tags","topic")
            VALUES (?1,?2,'MCQ',?3,?4,?5,?6,'["seed"]','linear')
            "#,
        )
        .bind(id)
        .bind(skill_unit_id)
        .bind(rating)
        .bind(format!("Solve item {id}"))
        .bind(r#"{"A":"x = 1","B":"x = 2","C":"x = 3"}"#)
        .bind(correct)
        .execute(self.pool())
        .await
        .expect("seed item");
    }

    /// One subject, one domain, one skill unit, no items.
    pub async fn seed_world(&self) {
        self.seed_domain(DOMAIN_ID, DOMAIN_SLUG).await;
        self.seed_skill_unit(UNIT_ID, DOMAIN_ID, UNIT_SLUG, 0).await;
    }

    pub async fn seed_session(&self, token: &str, learner_id: &str, valid_for: Duration) {
        sqlx::query(r#"INSERT INTO "sessions" ("token","userId","expiresAt") VALUES (?1,?2,?3)"#)
            .bind(hash_token(token))
            .bind(learner_id)
            .bind((Utc::now() + valid_for).naive_utc())
            .execute(self.pool())
            .await
            .expect("seed session");
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!(r#"SELECT COUNT(*) FROM "{table}""#))
            .fetch_one(self.pool())
            .await
            .expect("count rows")
    }

    pub fn app(&self, config: Config) -> Router {
        calibra_backend::app_with_store(config, self.store.clone())
    }
}
