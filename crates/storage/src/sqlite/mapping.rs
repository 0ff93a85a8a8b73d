use drill_core::model::{
    Filters, Guess, GuessId, Mood, Pronoun, QuestionSeed, Round, RoundId, RoundStatus, Tense,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Unique violations on `rounds` can only come from the single-active-round index.
pub(crate) fn insert_round_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::ActiveRoundExists,
        _ => conn(e),
    }
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn round_id_from_i64(v: i64) -> Result<RoundId, StorageError> {
    Ok(RoundId::new(i64_to_u64("round_id", v)?))
}

pub(crate) fn guess_id_from_i64(v: i64) -> Result<GuessId, StorageError> {
    Ok(GuessId::new(i64_to_u64("guess_id", v)?))
}

pub(crate) fn parse_pronoun(s: &str) -> Result<Pronoun, StorageError> {
    Pronoun::from_code(s).ok_or_else(|| StorageError::Serialization(format!("invalid pronoun: {s}")))
}

pub(crate) fn parse_tense(s: &str) -> Result<Tense, StorageError> {
    Tense::from_code(s).ok_or_else(|| StorageError::Serialization(format!("invalid tense: {s}")))
}

pub(crate) fn parse_mood(s: &str) -> Result<Mood, StorageError> {
    Mood::from_code(s).ok_or_else(|| StorageError::Serialization(format!("invalid mood: {s}")))
}

pub(crate) fn filters_to_json(filters: &Filters) -> Result<String, StorageError> {
    serde_json::to_string(filters).map_err(ser)
}

pub(crate) fn map_round_row(row: &sqlx::sqlite::SqliteRow) -> Result<Round, StorageError> {
    let filters_json: String = row.try_get("filters").map_err(ser)?;
    let filters: Filters = serde_json::from_str(&filters_json).map_err(ser)?;
    let status_str: String = row.try_get("status").map_err(ser)?;

    Round::from_persisted(
        round_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("ended_at").map_err(ser)?,
        filters,
        u32_from_i64(
            "num_questions",
            row.try_get::<i64, _>("num_questions").map_err(ser)?,
        )?,
        u32_from_i64(
            "num_correct_answers",
            row.try_get::<i64, _>("num_correct_answers").map_err(ser)?,
        )?,
        RoundStatus::parse(&status_str).map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_guess_row(row: &sqlx::sqlite::SqliteRow) -> Result<Guess, StorageError> {
    let seed = QuestionSeed {
        verb: row.try_get("verb").map_err(ser)?,
        pronoun: parse_pronoun(&row.try_get::<String, _>("pronoun").map_err(ser)?)?,
        tense: parse_tense(&row.try_get::<String, _>("tense").map_err(ser)?)?,
        mood: parse_mood(&row.try_get::<String, _>("mood").map_err(ser)?)?,
        correct_answer: row.try_get("correct_answer").map_err(ser)?,
    };

    Guess::from_persisted(
        guess_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        round_id_from_i64(row.try_get::<i64, _>("round_id").map_err(ser)?)?,
        seed,
        row.try_get("user_answer").map_err(ser)?,
        row.try_get("is_correct").map_err(ser)?,
        row.try_get("skipped").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}
