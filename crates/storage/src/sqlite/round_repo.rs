use chrono::{DateTime, Utc};
use drill_core::model::{Guess, Round, RoundId};
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{
    conn, filters_to_json, guess_id_from_i64, id_i64, insert_round_err, map_guess_row,
    map_round_row, round_id_from_i64,
};
use crate::repository::{NewRoundRecord, RoundRepository, RoundWithGuesses, StorageError};

const ROUND_COLUMNS: &str =
    "id, started_at, ended_at, filters, num_questions, num_correct_answers, status";

pub(super) const GUESS_COLUMNS: &str = "id, round_id, verb, pronoun, tense, mood, correct_answer, \
     user_answer, is_correct, skipped, created_at";

async fn fetch_round(db: &mut SqliteConnection, id: RoundId) -> Result<Option<Round>, StorageError> {
    let sql = format!("SELECT {ROUND_COLUMNS} FROM rounds WHERE id = ?1");
    let row = sqlx::query(&sql)
        .bind(id_i64("round_id", id.value())?)
        .fetch_optional(&mut *db)
        .await
        .map_err(conn)?;
    row.as_ref().map(map_round_row).transpose()
}

pub(super) async fn fetch_guesses(
    db: &mut SqliteConnection,
    round_id: RoundId,
) -> Result<Vec<Guess>, StorageError> {
    let sql = format!("SELECT {GUESS_COLUMNS} FROM guesses WHERE round_id = ?1 ORDER BY position");
    let rows = sqlx::query(&sql)
        .bind(id_i64("round_id", round_id.value())?)
        .fetch_all(&mut *db)
        .await
        .map_err(conn)?;
    rows.iter().map(map_guess_row).collect()
}

async fn with_guesses(
    db: &mut SqliteConnection,
    round: Option<Round>,
) -> Result<Option<RoundWithGuesses>, StorageError> {
    match round {
        Some(round) => {
            let guesses = fetch_guesses(db, round.id()).await?;
            Ok(Some(RoundWithGuesses { round, guesses }))
        }
        None => Ok(None),
    }
}

/// Inserts the round row and every guess row on the given connection.
async fn insert_round(
    db: &mut SqliteConnection,
    new: NewRoundRecord,
) -> Result<RoundWithGuesses, StorageError> {
    let num_questions = i64::try_from(new.seeds.len())
        .map_err(|_| StorageError::Serialization("too many guesses".into()))?;

    let res = sqlx::query(
        r"
            INSERT INTO rounds (started_at, ended_at, filters, num_questions, num_correct_answers, status)
            VALUES (?1, NULL, ?2, ?3, 0, 'active')
        ",
    )
    .bind(new.started_at)
    .bind(filters_to_json(&new.filters)?)
    .bind(num_questions)
    .execute(&mut *db)
    .await
    .map_err(insert_round_err)?;
    let round_id = round_id_from_i64(res.last_insert_rowid())?;

    let mut guesses = Vec::with_capacity(new.seeds.len());
    for (position, seed) in new.seeds.into_iter().enumerate() {
        let position = i64::try_from(position)
            .map_err(|_| StorageError::Serialization("position overflow".into()))?;
        let res = sqlx::query(
            r"
                INSERT INTO guesses (
                    round_id, position, verb, pronoun, tense, mood, correct_answer,
                    user_answer, is_correct, skipped, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, 0, ?8)
            ",
        )
        .bind(id_i64("round_id", round_id.value())?)
        .bind(position)
        .bind(&seed.verb)
        .bind(seed.pronoun.as_str())
        .bind(seed.tense.as_str())
        .bind(seed.mood.as_str())
        .bind(&seed.correct_answer)
        .bind(new.started_at)
        .execute(&mut *db)
        .await
        .map_err(conn)?;
        let id = guess_id_from_i64(res.last_insert_rowid())?;
        guesses.push(Guess::new(id, round_id, seed, new.started_at));
    }

    let round = fetch_round(db, round_id).await?.ok_or(StorageError::NotFound)?;
    Ok(RoundWithGuesses { round, guesses })
}

/// Completes the round if it is still active; a completed round is returned untouched.
async fn complete_in(
    db: &mut SqliteConnection,
    id: RoundId,
    ended_at: DateTime<Utc>,
    num_correct_answers: u32,
) -> Result<Round, StorageError> {
    let mut round = fetch_round(db, id).await?.ok_or(StorageError::NotFound)?;
    if !round.complete(ended_at, num_correct_answers) {
        return Ok(round);
    }

    sqlx::query(
        r"
            UPDATE rounds
            SET status = 'completed', ended_at = ?1, num_correct_answers = ?2
            WHERE id = ?3 AND status = 'active'
        ",
    )
    .bind(round.ended_at())
    .bind(i64::from(round.num_correct_answers()))
    .bind(id_i64("round_id", id.value())?)
    .execute(&mut *db)
    .await
    .map_err(conn)?;

    Ok(round)
}

#[async_trait::async_trait]
impl RoundRepository for SqliteRepository {
    async fn create_round(&self, new: NewRoundRecord) -> Result<RoundWithGuesses, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let created = insert_round(&mut tx, new).await?;
        tx.commit().await.map_err(conn)?;
        Ok(created)
    }

    async fn get_round(&self, id: RoundId) -> Result<Option<RoundWithGuesses>, StorageError> {
        let mut db = self.pool.acquire().await.map_err(conn)?;
        let round = fetch_round(&mut db, id).await?;
        with_guesses(&mut db, round).await
    }

    async fn active_round(&self) -> Result<Option<RoundWithGuesses>, StorageError> {
        let mut db = self.pool.acquire().await.map_err(conn)?;
        let sql = format!("SELECT {ROUND_COLUMNS} FROM rounds WHERE status = 'active' LIMIT 1");
        let row = sqlx::query(&sql)
            .fetch_optional(&mut *db)
            .await
            .map_err(conn)?;
        let round = row.as_ref().map(map_round_row).transpose()?;
        with_guesses(&mut db, round).await
    }

    async fn complete_round(
        &self,
        id: RoundId,
        ended_at: DateTime<Utc>,
        num_correct_answers: u32,
    ) -> Result<Round, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let round = complete_in(&mut tx, id, ended_at, num_correct_answers).await?;
        tx.commit().await.map_err(conn)?;
        Ok(round)
    }

    async fn transition_round(
        &self,
        id: RoundId,
        ended_at: DateTime<Utc>,
        num_correct_answers: u32,
        new: NewRoundRecord,
    ) -> Result<(Round, RoundWithGuesses), StorageError> {
        // dropping the transaction on error rolls back the completion
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let completed = complete_in(&mut tx, id, ended_at, num_correct_answers).await?;
        let created = insert_round(&mut tx, new).await?;
        tx.commit().await.map_err(conn)?;
        Ok((completed, created))
    }

    async fn list_rounds(&self, limit: u32) -> Result<Vec<Round>, StorageError> {
        let sql = format!(
            "SELECT {ROUND_COLUMNS} FROM rounds ORDER BY started_at DESC, id DESC LIMIT ?1"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_round_row).collect()
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
