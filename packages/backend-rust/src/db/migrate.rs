use sqlx::PgPool;

/// Ordered Postgres migrations. Append only; names are recorded in `_migrations`.
pub(crate) const MIGRATIONS: &[(&str, &str)] = &[(
    "001_calibration_schema",
    include_str!("../../sql/001_calibration_schema.sql"),
)];

pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "_migrations" (
            "id" SERIAL PRIMARY KEY,
            "name" TEXT NOT NULL UNIQUE,
            "applied_at" TIMESTAMP NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    let applied: Vec<String> =
        sqlx::query_scalar(r#"SELECT "name" FROM "_migrations" ORDER BY "id""#)
            .fetch_all(pool)
            .await?;

    let mut applied_count = 0;
    for (name, sql) in pending(MIGRATIONS, &applied) {
        tracing::info!(migration = name, "applying migration");

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(|source| MigrationError::Migration {
                name: name.to_string(),
                source,
            })?;
        sqlx::query(r#"INSERT INTO "_migrations" ("name") VALUES ($1)"#)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        applied_count += 1;
    }

    if applied_count > 0 {
        tracing::info!(count = applied_count, "database migrations completed");
    } else {
        tracing::debug!("database schema up to date");
    }
    Ok(())
}

fn pending<'a>(
    migrations: &'a [(&'a str, &'a str)],
    applied: &'a [String],
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    migrations
        .iter()
        .copied()
        .filter(move |(name, _)| !applied.iter().any(|done| done == name))
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Migration '{name}' failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
