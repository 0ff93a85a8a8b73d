use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::Storage;

mod coverage_repo;
mod guess_repo;
mod mapping;
mod migrate;
mod round_repo;

/// Applied to every pooled connection. Round and guess rows rely on the foreign key from
/// `guesses.round_id`, and background guess writes contend with request handlers.
const CONNECTION_PRAGMAS: [&str; 3] = [
    "PRAGMA foreign_keys = ON;",
    "PRAGMA journal_mode = WAL;",
    "PRAGMA busy_timeout = 5000;",
];

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Rounds, guesses and coverage queries over one `SQLite` pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or a connection pragma fails.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    for pragma in CONNECTION_PRAGMAS {
                        sqlx::query(pragma).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Connect and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Same as [`SqliteRepository::connect`], plus failed migrations.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// # Errors
    ///
    /// Returns `SqliteInitError` if a pending migration fails. Applied versions are skipped.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::open(database_url).await?;
        Ok(Self {
            rounds: Arc::new(repo.clone()),
            guesses: Arc::new(repo.clone()),
            coverage: Arc::new(repo),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{GuessRepository, RoundRepository};
    use drill_core::model::RoundId;

    #[tokio::test]
    async fn reopening_a_migrated_database_is_a_no_op() {
        let url = "sqlite:file:reopen_drill?mode=memory&cache=shared";
        let first = SqliteRepository::open(url).await.unwrap();
        let second = SqliteRepository::open(url).await.unwrap();
        second.migrate().await.unwrap();

        let rounds: Arc<dyn RoundRepository> = Arc::new(first);
        assert!(rounds.active_round().await.unwrap().is_none());
        let guesses: Arc<dyn GuessRepository> = Arc::new(second);
        assert!(guesses
            .guesses_for_round(RoundId::new(1))
            .await
            .unwrap()
            .is_empty());
    }
}
