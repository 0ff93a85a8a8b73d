use std::collections::BTreeSet;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use drill_core::model::Mood;
use services::CoverageOptions;

use super::split_list;
use crate::response::{AppError, ok};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/coverage", get(coverage))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoverageQuery {
    mood: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    min_questions: Option<u32>,
}

impl CoverageQuery {
    fn into_options(self) -> Result<CoverageOptions, AppError> {
        let moods = split_list(self.mood.as_deref())
            .map(|codes| {
                codes
                    .iter()
                    .map(|code| {
                        Mood::from_code(code).ok_or_else(|| {
                            AppError::validation("INVALID_MOOD", format!("unknown mood: {code}"))
                        })
                    })
                    .collect::<Result<BTreeSet<_>, _>>()
            })
            .transpose()?;

        Ok(CoverageOptions {
            moods,
            start: parse_date("startDate", self.start_date.as_deref())?,
            end: parse_date("endDate", self.end_date.as_deref())?,
            min_questions: self.min_questions,
        })
    }
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| {
                AppError::validation(
                    "INVALID_DATE",
                    format!("{field} must be an RFC 3339 timestamp"),
                )
            })
    })
    .transpose()
}

async fn coverage(
    State(state): State<AppState>,
    query: Result<Query<CoverageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let options = query.into_options()?;
    let report = state.coverage().report(&options).await?;
    Ok(ok(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(mood: Option<&str>, start: Option<&str>) -> CoverageQuery {
        CoverageQuery {
            mood: mood.map(str::to_string),
            start_date: start.map(str::to_string),
            end_date: None,
            min_questions: None,
        }
    }

    #[test]
    fn parses_moods_and_dates() {
        let options = query(Some("indicative,subjunctive"), Some("2024-01-01T00:00:00Z"))
            .into_options()
            .unwrap();
        let moods = options.moods.unwrap();
        assert!(moods.contains(&Mood::Indicative));
        assert!(moods.contains(&Mood::Subjunctive));
        assert!(options.start.is_some());
        assert_eq!(options.end, None);
    }

    #[test]
    fn rejects_unknown_mood() {
        let err = query(Some("conditional-ish"), None).into_options().unwrap_err();
        assert_eq!(err.code(), "INVALID_MOOD");
    }

    #[test]
    fn rejects_malformed_date() {
        let err = query(None, Some("yesterday")).into_options().unwrap_err();
        assert_eq!(err.code(), "INVALID_DATE");
    }
}
