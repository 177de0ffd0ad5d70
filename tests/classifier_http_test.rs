use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use turbo_coach_backend::services::classifier::{
    Classifier, ClassifierConfig, ClassifierRequest, ClassifierUnavailable, RemoteClassifier,
};
use turbo_coach_backend::services::evaluation::EvaluationSource;
use turbo_coach_backend::services::gate::GateConfig;
use turbo_coach_backend::services::language::{builtin_languages, LanguageRegistry};
use turbo_coach_backend::services::pipeline::{EvaluationPipeline, FallbackConfig};

const FULL_ANSWER: &str = "Mi casa es grande y está en el centro de la ciudad";

#[derive(Clone, Default)]
struct StubState {
    flaky_calls: Arc<AtomicUsize>,
}

async fn scored(Json(body): Json<Value>) -> Response {
    assert_eq!(body["lang"], "es");
    assert!(body["task"].is_string());
    Json(json!({"score": 6.4, "focus": "Tense", "feedback": "Nice use of 'está'."})).into_response()
}

async fn failing() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

async fn rejected() -> Response {
    (StatusCode::BAD_REQUEST, "bad input").into_response()
}

async fn malformed() -> Response {
    (StatusCode::OK, "this is not json").into_response()
}

async fn flaky(State(state): State<StubState>) -> Response {
    if state.flaky_calls.fetch_add(1, Ordering::SeqCst) == 0 {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({"score": 8, "feedback": "Well developed."})).into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"score": 9, "feedback": "Too late."})).into_response()
}

async fn spawn_stub() -> (SocketAddr, StubState) {
    let state = StubState::default();
    let app = Router::new()
        .route("/scored", post(scored))
        .route("/failing", post(failing))
        .route("/rejected", post(rejected))
        .route("/malformed", post(malformed))
        .route("/flaky", post(flaky))
        .route("/slow", post(slow))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn classifier(addr: SocketAddr, path: &str, max_retries: usize) -> RemoteClassifier {
    RemoteClassifier::new(ClassifierConfig {
        endpoint: Some(format!("http://{addr}{path}")),
        timeout: Duration::from_millis(500),
        max_retries,
    })
}

fn request() -> ClassifierRequest<'static> {
    ClassifierRequest {
        task: "Describe your house",
        answer: FULL_ANSWER,
        lang: "es",
    }
}

#[tokio::test]
async fn test_successful_classification() {
    let (addr, _) = spawn_stub().await;
    let eval = classifier(addr, "/scored", 0).classify(request()).await.unwrap();

    assert_eq!(eval.score, 6);
    assert_eq!(eval.focus.as_deref(), Some("Tense"));
    assert_eq!(eval.source, EvaluationSource::Classifier);
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let (addr, _) = spawn_stub().await;
    let result = classifier(addr, "/failing", 0).classify(request()).await;
    assert_eq!(result, Err(ClassifierUnavailable::HttpStatus { status: 500 }));
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let (addr, _) = spawn_stub().await;
    let result = classifier(addr, "/rejected", 3).classify(request()).await;
    assert_eq!(result, Err(ClassifierUnavailable::HttpStatus { status: 400 }));
}

#[tokio::test]
async fn test_malformed_body_is_unavailable() {
    let (addr, _) = spawn_stub().await;
    let result = classifier(addr, "/malformed", 0).classify(request()).await;
    assert!(matches!(result, Err(ClassifierUnavailable::Malformed(_))));
}

#[tokio::test]
async fn test_retry_recovers_from_transient_failure() {
    let (addr, state) = spawn_stub().await;
    let eval = classifier(addr, "/flaky", 1).classify(request()).await.unwrap();

    assert_eq!(eval.score, 8);
    assert_eq!(state.flaky_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_timeout_is_unavailable() {
    let (addr, _) = spawn_stub().await;
    let result = classifier(addr, "/slow", 0).classify(request()).await;
    assert!(matches!(result, Err(ClassifierUnavailable::Transport(_))));
}

#[tokio::test]
async fn test_pipeline_falls_back_when_remote_fails() {
    let (addr, _) = spawn_stub().await;
    let pipeline = EvaluationPipeline::new(
        Arc::new(LanguageRegistry::from_specs(&builtin_languages()).unwrap()),
        GateConfig::default(),
        FallbackConfig::default(),
        Arc::new(classifier(addr, "/failing", 0)),
    );

    let eval = pipeline.evaluate(FULL_ANSWER, "Describe your house", "es").await;
    assert_eq!(eval.score, 7);
    assert_eq!(eval.source, EvaluationSource::Fallback);

    let gated = pipeline.evaluate("casa", "Describe your house", "es").await;
    assert_eq!(gated.source, EvaluationSource::Gate);
}
