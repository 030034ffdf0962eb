use crate::Result;

use sqlx::{
    Pool, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::path::Path;
use tracing::{debug, trace};

/// An object that represents a connection to the weather database
#[derive(Clone, Debug)]
pub struct Database(Pool<Sqlite>);

impl From<Pool<Sqlite>> for Database {
    /// **WARNING**: This is primarily intended for tests. You should probably
    /// use [Database::open()] instead of creating the pool yourself, since
    /// [Database::open()] will perform database schema migration automatically.
    fn from(value: Pool<Sqlite>) -> Self {
        Self(value)
    }
}

impl Database {
    /// Open a connection to the specified database, creating the file if it
    /// doesn't exist yet. This will also perform any necessary sql migrations
    /// to ensure that the database is up to date with the latest schema
    /// changes.
    pub async fn open<P: AsRef<Path>>(db: P) -> Result<Self> {
        debug!(path = ?db.as_ref(), "Opening database");
        let options = SqliteConnectOptions::new()
            .filename(db)
            .create_if_missing(true)
            .foreign_keys(true);
        let dbpool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::migrate(&dbpool).await?;
        Ok(Database(dbpool))
    }

    /// Open a private in-memory database. Mostly useful for tests and
    /// throwaway instances.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        // every connection to an in-memory database gets its own database,
        // so keep the pool pinned to a single connection
        let dbpool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::migrate(&dbpool).await?;
        Ok(Database(dbpool))
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        trace!("Running database migrations");
        sqlx::migrate!("../db/migrations").run(pool).await?;
        Ok(())
    }

    /// gets a reference to the underlying sqlx connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test(tokio::test)]
    async fn test_open_in_memory_runs_migrations() {
        let db = Database::open_in_memory()
            .await
            .expect("failed to open database");
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name LIKE 'wd_%'",
        )
        .fetch_one(db.pool())
        .await
        .expect("failed to query schema");
        assert_eq!(count, 2);

        let fk: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .expect("failed to query pragma");
        assert_eq!(fk, 1);
    }
}
