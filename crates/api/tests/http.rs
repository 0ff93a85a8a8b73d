use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use api::{AppState, router};
use drill_core::time::fixed_now;
use drill_core::{Clock, TableConjugator};
use services::QuestionSampler;
use storage::repository::Storage;

fn app() -> Router {
    let sampler = QuestionSampler::new(Arc::new(TableConjugator::new())).with_seed(7);
    let state = AppState::new(&Storage::in_memory(), Clock::fixed(fixed_now()), sampler);
    router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn five_questions() -> Value {
    json!({
        "filters": { "pronouns": ["yo", "tu"], "tenses": ["present"], "moods": ["indicative"] },
        "numQuestions": 5
    })
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, json) = send(app, Method::POST, "/api/rounds", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["data"].clone()
}

#[tokio::test]
async fn create_returns_round_with_pending_guesses() {
    let app = app();
    let data = create(&app, five_questions()).await;

    assert_eq!(data["round"]["status"], "active");
    assert_eq!(data["round"]["numQuestions"], 5);
    let guesses = data["guesses"].as_array().unwrap();
    assert_eq!(guesses.len(), 5);
    assert!(guesses.iter().all(|g| g["userAnswer"].is_null()));
    assert_eq!(data["score"], json!({ "correct": 0, "total": 0 }));
}

#[tokio::test]
async fn second_create_conflicts_and_echoes_filters() {
    let app = app();
    create(&app, five_questions()).await;

    let (status, body) = send(&app, Method::POST, "/api/rounds", Some(five_questions())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "ACTIVE_ROUND_EXISTS");
    assert_eq!(body["details"]["filters"]["numQuestions"], 5);
}

#[tokio::test]
async fn invalid_filters_are_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/rounds",
        Some(json!({ "filters": { "moods": [] } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FILTERS");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/rounds",
        Some(json!({ "numQuestions": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/rounds")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_active_round_reports_last_filters() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/rounds/active", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NO_ACTIVE_ROUND");
    assert!(body["details"]["lastFilters"].is_null());

    let data = create(&app, five_questions()).await;
    let id = data["round"]["id"].as_u64().unwrap();
    let (status, _) = send(&app, Method::PUT, &format!("/api/rounds/{id}/complete"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/api/rounds/active", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["details"]["lastFilters"]["numQuestions"], 5);
}

#[tokio::test]
async fn answering_and_skipping_updates_the_score() {
    let app = app();
    let data = create(&app, five_questions()).await;
    let round_id = data["round"]["id"].as_u64().unwrap();
    let guesses = data["guesses"].as_array().unwrap();

    let first = &guesses[0];
    let id = first["id"].as_u64().unwrap();
    let answer = first["correctAnswer"].as_str().unwrap();
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/rounds/guesses/{id}/submit"),
        Some(json!({ "userAnswer": answer })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "correct");
    assert_eq!(body["data"]["score"], json!({ "correct": 1, "total": 1 }));

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/rounds/guesses/{id}/submit"),
        Some(json!({ "userAnswer": answer })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "GUESS_ALREADY_FINALIZED");

    let second = guesses[1]["id"].as_u64().unwrap();
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/rounds/guesses/{second}/skip"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["correctAnswer"], guesses[1]["correctAnswer"]);
    assert_eq!(body["data"]["score"], json!({ "correct": 1, "total": 2 }));

    let (status, body) = send(&app, Method::GET, &format!("/api/rounds/{round_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["guesses"][1]["skipped"], true);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/rounds/{round_id}/complete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["round"]["status"], "completed");
    assert_eq!(body["data"]["round"]["numCorrectAnswers"], 1);

    let third = guesses[2]["id"].as_u64().unwrap();
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/rounds/guesses/{third}/skip"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ROUND_COMPLETED");
}

#[tokio::test]
async fn legacy_update_recomputes_correctness() {
    let app = app();
    let data = create(&app, five_questions()).await;
    let id = data["guesses"][0]["id"].as_u64().unwrap();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/rounds/guesses/{id}"),
        Some(json!({ "userAnswer": "zzz", "isCorrect": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["guess"]["isCorrect"], false);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/rounds/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ROUND_NOT_FOUND");

    let (status, body) = send(&app, Method::POST, "/api/rounds/guesses/999/skip", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "GUESS_NOT_FOUND");
}

#[tokio::test]
async fn non_numeric_ids_use_the_error_envelope() {
    let app = app();
    for (method, uri) in [
        (Method::GET, "/api/rounds/abc"),
        (Method::PUT, "/api/rounds/abc/complete"),
        (Method::POST, "/api/rounds/guesses/x1/skip"),
    ] {
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INVALID_ID");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn transition_completes_old_round_and_starts_new_one() {
    let app = app();
    let data = create(&app, five_questions()).await;
    let old_id = data["round"]["id"].as_u64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/rounds/{old_id}/transition"),
        Some(json!({ "filters": { "tenses": ["preterite"] }, "numQuestions": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(data["completedRound"]["status"], "completed");
    assert_eq!(data["newRound"]["status"], "active");
    assert_eq!(data["guesses"].as_array().unwrap().len(), 10);
    assert_eq!(data["reason"], "filters_changed");

    let (_, body) = send(&app, Method::GET, "/api/rounds/active", None).await;
    assert_eq!(body["data"]["round"]["id"], data["newRound"]["id"]);

    let (status, body) = send(&app, Method::GET, "/api/rounds/history?includeQuestions=true", None).await;
    assert_eq!(status, StatusCode::OK);
    let rounds = body["data"]["rounds"].as_array().unwrap();
    assert_eq!(rounds.len(), 2);
    assert!(rounds[0]["guesses"].is_array());
}

#[tokio::test]
async fn questions_endpoint_respects_count_bounds() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/questions?count=3&pronoun=yo,nosotros&tense=present&mood=indicative",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let questions = body["data"]["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert!(
        questions
            .iter()
            .all(|q| q["pronoun"] == "yo" || q["pronoun"] == "nosotros")
    );

    let (status, body) = send(&app, Method::GET, "/api/questions?count=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_COUNT");

    let (status, _) = send(&app, Method::GET, "/api/questions?count=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn coverage_counts_guesses_by_bin() {
    let app = app();
    create(&app, five_questions()).await;

    let (status, body) = send(&app, Method::GET, "/api/metrics/coverage?mood=indicative", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["metadata"]["totalQuestions"], 5);
    let bins = body["data"]["bins"].as_array().unwrap();
    assert!(!bins.is_empty());
    assert!(bins.iter().all(|b| b["mood"] == "indicative"));

    let (status, body) = send(&app, Method::GET, "/api/metrics/coverage?mood=subjunctive", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["metadata"]["totalQuestions"], 0);

    let (status, body) = send(&app, Method::GET, "/api/metrics/coverage?startDate=nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_DATE");
}

#[tokio::test]
async fn conjugation_table_for_known_and_unknown_verbs() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/verbs/hablar/conjugations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["verb"], "hablar");
    assert!(!body["data"]["conjugations"].as_array().unwrap().is_empty());

    let (status, body) = send(&app, Method::GET, "/api/verbs/xyz/conjugations", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "VERB_NOT_FOUND");
}

#[tokio::test]
async fn health_and_fallback() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "db": "connected" }));

    let (status, body) = send(&app, Method::GET, "/api/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
