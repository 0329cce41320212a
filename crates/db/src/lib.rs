//! SQLite connection pool factory and migration runner.

use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Shared pool handle passed to modules.
pub type DbPool = SqlitePool;

const MIGRATIONS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    scope      TEXT NOT NULL,
    id         TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (scope, id)
)";

/// A migration script waiting to be applied, keyed by the owning scope.
#[derive(Debug, Clone, Copy)]
pub struct PendingMigration<'a> {
    pub scope: &'a str,
    pub id: &'a str,
    pub sql: &'a str,
}

/// Open a connection pool for the given SQLite URL.
///
/// In-memory databases live only as long as their connection, so the pool
/// keeps its connections alive indefinitely for them.
pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<DbPool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url '{url}'"))?
        .create_if_missing(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
    if is_in_memory(url) {
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to '{url}'"))?;

    tracing::info!(target: "shelf-db", url, max_connections, "database pool ready");
    Ok(pool)
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Apply every migration that has not yet been recorded in `_migrations`.
///
/// Each script runs in its own transaction together with its bookkeeping row.
/// Returns the number of scripts applied.
pub async fn apply_migrations<'a, I>(pool: &DbPool, migrations: I) -> anyhow::Result<usize>
where
    I: IntoIterator<Item = PendingMigration<'a>>,
{
    sqlx::query(MIGRATIONS_TABLE_SQL)
        .execute(pool)
        .await
        .context("failed to create migrations table")?;

    let mut applied = 0;
    for migration in migrations {
        let already: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM _migrations WHERE scope = ? AND id = ?")
                .bind(migration.scope)
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .context("failed to read migrations table")?;
        if already.is_some() {
            tracing::debug!(
                target: "shelf-db",
                scope = migration.scope,
                id = migration.id,
                "migration already applied"
            );
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.sql)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "migration '{}/{}' failed",
                    migration.scope, migration.id
                )
            })?;
        sqlx::query("INSERT INTO _migrations (scope, id) VALUES (?, ?)")
            .bind(migration.scope)
            .bind(migration.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            target: "shelf-db",
            scope = migration.scope,
            id = migration.id,
            "migration applied"
        );
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATE_WIDGET: PendingMigration<'static> = PendingMigration {
        scope: "widgets",
        id: "001_init",
        sql: "CREATE TABLE widget (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
              CREATE INDEX widget_name ON widget (name);",
    };

    #[tokio::test]
    async fn applies_pending_migrations_once() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();

        let first = apply_migrations(&pool, [CREATE_WIDGET]).await.unwrap();
        let second = apply_migrations(&pool, [CREATE_WIDGET]).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM widget")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn failed_migration_is_not_recorded() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let broken = PendingMigration {
            scope: "widgets",
            id: "002_broken",
            sql: "CREATE TABLE oops (",
        };

        assert!(apply_migrations(&pool, [broken]).await.is_err());

        let recorded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(recorded, 0);
    }

    #[test]
    fn detects_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file.db?mode=memory"));
        assert!(!is_in_memory("sqlite://api_demo.db?mode=rwc"));
    }
}
