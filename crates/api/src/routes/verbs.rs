use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use drill_core::conjugation::ConjugatedForm;

use crate::response::{AppError, ok};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:verb/conjugations", get(conjugations))
}

#[derive(Debug, Serialize)]
struct ConjugationsResponse {
    verb: String,
    conjugations: Vec<ConjugatedForm>,
}

async fn conjugations(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(verb) = path?;
    let conjugations = state.questions().conjugations(&verb)?;
    Ok(ok(ConjugationsResponse {
        verb: verb.trim().to_lowercase(),
        conjugations,
    }))
}
