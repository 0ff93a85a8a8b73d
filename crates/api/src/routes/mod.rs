mod health;
mod metrics;
mod questions;
mod rounds;
mod verbs;

use axum::Router;
use axum::http::Uri;
use axum::routing::get;

use crate::response::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api/rounds", rounds::router())
        .nest("/api/questions", questions::router())
        .nest("/api/metrics", metrics::router())
        .nest("/api/verbs", verbs::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler(uri: Uri) -> AppError {
    AppError::not_found("NOT_FOUND", format!("no route for {}", uri.path()))
}

/// Splits a comma-separated query value. `None` stays `None` so defaults apply.
pub(crate) fn split_list(raw: Option<&str>) -> Option<Vec<String>> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::split_list;

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(split_list(None), None);
        assert_eq!(
            split_list(Some("yo, él/ella ,,tu")),
            Some(vec!["yo".to_string(), "él/ella".to_string(), "tu".to_string()])
        );
        assert_eq!(split_list(Some("")), Some(vec![]));
    }
}
