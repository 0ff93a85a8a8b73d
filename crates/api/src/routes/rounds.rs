use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;

use drill_core::model::{
    AttemptOutcome, Guess, GuessId, RawFilters, Round, RoundId, Score,
};
use services::{HistoryEntry, RoundError, RoundView, TransitionReason};

use crate::response::{AppError, ok};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_round))
        .route("/active", get(get_active_round))
        .route("/history", get(history))
        .route("/guesses/:id", put(record_answer))
        .route("/guesses/:id/submit", post(submit_answer))
        .route("/guesses/:id/skip", post(skip_guess))
        .route("/:id", get(get_round))
        .route("/:id/complete", put(complete_round))
        .route("/:id/transition", post(transition_round))
}

//
// ─── PAYLOADS ──────────────────────────────────────────────────────────────────
//

/// Create/transition body. Top-level settings override the same keys inside `filters`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoundRequest {
    #[serde(default)]
    filters: RawFilters,
    num_questions: Option<u32>,
    verb_class: Option<String>,
    allow_retry: Option<bool>,
}

impl RoundRequest {
    fn into_raw(self) -> RawFilters {
        let mut raw = self.filters;
        if self.num_questions.is_some() {
            raw.num_questions = self.num_questions;
        }
        if self.verb_class.is_some() {
            raw.verb_class = self.verb_class;
        }
        if self.allow_retry.is_some() {
            raw.allow_retry = self.allow_retry;
        }
        raw
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    limit: Option<u32>,
    #[serde(default)]
    include_questions: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest {
    user_answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordAnswerRequest {
    user_answer: String,
    is_correct: Option<bool>,
}

#[derive(Debug, Serialize)]
struct RoundResponse {
    round: Round,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransitionResponse {
    completed_round: Round,
    new_round: Round,
    guesses: Vec<Guess>,
    score: Score,
    reason: TransitionReason,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    rounds: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    guess_id: GuessId,
    outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    correct_answer: Option<String>,
    score: Score,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SkipResponse {
    guess_id: GuessId,
    correct_answer: String,
    score: Score,
}

#[derive(Debug, Serialize)]
struct GuessResponse {
    guess: Guess,
}

//
// ─── HANDLERS ──────────────────────────────────────────────────────────────────
//

/// Echo the submitted filters so the client can return to filter selection pre-filled.
fn with_submitted_filters(err: RoundError, raw: &RawFilters) -> AppError {
    AppError::from(err).with_details(json!({ "filters": raw }))
}

async fn create_round(
    State(state): State<AppState>,
    payload: Result<Json<RoundRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let raw = request.into_raw();
    let view = state
        .rounds()
        .create_round(&raw)
        .await
        .map_err(|e| with_submitted_filters(e, &raw))?;
    Ok((StatusCode::CREATED, ok(view)))
}

async fn get_active_round(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    match state.rounds().get_active_round().await {
        Ok(view) => Ok(ok(view)),
        Err(RoundError::NoActiveRound) => {
            let last = state.rounds().last_used_filters().await?;
            Err(AppError::from(RoundError::NoActiveRound)
                .with_details(json!({ "lastFilters": last })))
        }
        Err(err) => Err(err.into()),
    }
}

async fn get_round(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let view: RoundView = state.rounds().get_round(RoundId::new(id)).await?;
    Ok(ok(view))
}

async fn complete_round(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let round = state.rounds().complete_round(RoundId::new(id)).await?;
    Ok(ok(RoundResponse { round }))
}

async fn transition_round(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<Json<RoundRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let raw = request.into_raw();
    let outcome = state
        .rounds()
        .transition_round(RoundId::new(id), &raw)
        .await
        .map_err(|e| with_submitted_filters(e, &raw))?;
    Ok(ok(TransitionResponse {
        completed_round: outcome.completed_round,
        new_round: outcome.new_round.round,
        guesses: outcome.new_round.guesses,
        score: outcome.new_round.score,
        reason: outcome.reason,
    }))
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let rounds = state
        .rounds()
        .history(query.limit, query.include_questions)
        .await?;
    Ok(ok(HistoryResponse { rounds }))
}

async fn submit_answer(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let result = state
        .rounds()
        .submit_answer(GuessId::new(id), &request.user_answer)
        .await?;
    Ok(ok(SubmitResponse {
        guess_id: result.guess.id(),
        outcome: result.outcome,
        correct_answer: result.correct_answer,
        score: result.score,
    }))
}

async fn skip_guess(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let result = state.rounds().skip_guess(GuessId::new(id)).await?;
    Ok(ok(SkipResponse {
        guess_id: result.guess.id(),
        correct_answer: result.correct_answer,
        score: result.score,
    }))
}

async fn record_answer(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<Json<RecordAnswerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let guess = state
        .rounds()
        .record_answer(GuessId::new(id), &request.user_answer, request.is_correct)
        .await?;
    Ok(ok(GuessResponse { guess }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_settings_override_nested_filters() {
        let request: RoundRequest = serde_json::from_value(json!({
            "filters": { "pronouns": ["yo"], "numQuestions": 20, "allowRetry": false },
            "numQuestions": 5,
            "allowRetry": true
        }))
        .unwrap();
        let raw = request.into_raw();
        assert_eq!(raw.pronouns, Some(vec!["yo".to_string()]));
        assert_eq!(raw.num_questions, Some(5));
        assert_eq!(raw.allow_retry, Some(true));
        assert_eq!(raw.verb_class, None);
    }

    #[test]
    fn empty_body_uses_defaults() {
        let request: RoundRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request.into_raw(), RawFilters::default());
    }
}
