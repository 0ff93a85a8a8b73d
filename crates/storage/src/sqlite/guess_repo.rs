use drill_core::model::{Guess, GuessId, Resolution, RoundId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_guess_row};
use super::round_repo::{GUESS_COLUMNS, fetch_guesses};
use crate::repository::{GuessRepository, StorageError};

impl SqliteRepository {
    async fn fetch_guess(&self, id: GuessId) -> Result<Option<Guess>, StorageError> {
        let sql = format!("SELECT {GUESS_COLUMNS} FROM guesses WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("guess_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_guess_row).transpose()
    }
}

#[async_trait::async_trait]
impl GuessRepository for SqliteRepository {
    async fn get_guess(&self, id: GuessId) -> Result<Option<Guess>, StorageError> {
        self.fetch_guess(id).await
    }

    async fn guesses_for_round(&self, round_id: RoundId) -> Result<Vec<Guess>, StorageError> {
        let mut db = self.pool.acquire().await.map_err(conn)?;
        fetch_guesses(&mut db, round_id).await
    }

    async fn finalize_guess(
        &self,
        id: GuessId,
        resolution: &Resolution,
    ) -> Result<Guess, StorageError> {
        let (user_answer, is_correct, skipped) = match resolution {
            Resolution::Answered {
                user_answer,
                is_correct,
            } => (Some(user_answer.as_str()), *is_correct, 0_i64),
            Resolution::Skipped => (None, false, 1_i64),
        };

        // the guard on the WHERE clause makes the first writer win
        let res = sqlx::query(
            r"
                UPDATE guesses
                SET user_answer = ?1, is_correct = ?2, skipped = ?3
                WHERE id = ?4 AND user_answer IS NULL AND skipped = 0
            ",
        )
        .bind(user_answer)
        .bind(is_correct)
        .bind(skipped)
        .bind(id_i64("guess_id", id.value())?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let stored = self.fetch_guess(id).await?.ok_or(StorageError::NotFound)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::AlreadyFinalized);
        }
        Ok(stored)
    }
}
