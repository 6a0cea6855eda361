pub mod migrate;
pub mod models;
pub mod postgres;
pub mod sqlite_primary;
pub mod sqlite_schema;
pub mod store;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::config::Config;
use crate::db::migrate::MigrationError;
use crate::db::postgres::PgStore;
use crate::db::sqlite_primary::{SqliteInitError, SqliteStore};

pub use store::{CalibrationStore, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbMode {
    ServerPostgres,
    DesktopSqlite,
}

impl DbMode {
    pub fn detect(config: &Config) -> Self {
        if config.database_url.is_some() {
            DbMode::ServerPostgres
        } else {
            DbMode::DesktopSqlite
        }
    }
}

/// Opens the store selected by `config`, bringing its schema up to date.
pub async fn connect(config: &Config) -> Result<Store, DbInitError> {
    match (DbMode::detect(config), config.database_url.as_deref()) {
        (DbMode::ServerPostgres, Some(url)) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect(url)
                .await?;
            migrate::run_migrations(&pool).await?;
            tracing::info!(mode = "postgres", "calibration store ready");
            Ok(Store::Postgres(PgStore::new(pool)))
        }
        _ => {
            let pool = sqlite_primary::init_sqlite_pool(&config.sqlite_path).await?;
            tracing::info!(
                mode = "sqlite",
                path = %config.sqlite_path.display(),
                "calibration store ready"
            );
            Ok(Store::Sqlite(SqliteStore::new(pool)))
        }
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate row")]
    Duplicate,
    /// The standing changed between read and write.
    #[error("standing was modified concurrently")]
    StaleStanding,
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("sql error: {0}")]
    Sqlx(sqlx::Error),
}

impl StoreError {
    /// Whether repeating the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Duplicate | StoreError::Corrupt(_) => false,
            StoreError::StaleStanding => true,
            StoreError::Sqlx(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::Protocol(_)
                    | sqlx::Error::WorkerCrashed
                    | sqlx::Error::Database(_)
            ),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let unique = err
            .as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false);

        if unique {
            StoreError::Duplicate
        } else {
            StoreError::Sqlx(err)
        }
    }
}
