use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use drill_core::model::RawFilters;
use services::Question;

use super::split_list;
use crate::response::{AppError, ok};
use crate::state::AppState;

const DEFAULT_COUNT: u32 = 10;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_questions))
}

/// Comma-separated `pronoun`, `tense` and `mood` lists.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionsQuery {
    count: Option<u32>,
    pronoun: Option<String>,
    tense: Option<String>,
    mood: Option<String>,
    verb_class: Option<String>,
}

#[derive(Debug, Serialize)]
struct QuestionsResponse {
    questions: Vec<Question>,
}

async fn list_questions(
    State(state): State<AppState>,
    query: Result<Query<QuestionsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let raw = RawFilters {
        pronouns: split_list(query.pronoun.as_deref()),
        tenses: split_list(query.tense.as_deref()),
        moods: split_list(query.mood.as_deref()),
        verb_class: query.verb_class,
        ..RawFilters::default()
    };
    let questions = state
        .questions()
        .questions(query.count.unwrap_or(DEFAULT_COUNT), &raw)?;
    Ok(ok(QuestionsResponse { questions }))
}
