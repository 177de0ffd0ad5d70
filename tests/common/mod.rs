#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use turbo_coach_backend::build_app;
use turbo_coach_backend::config::GameConfig;
use turbo_coach_backend::services::classifier::{
    Classifier, ClassifierRequest, ClassifierUnavailable,
};
use turbo_coach_backend::services::evaluation::{Evaluation, EvaluationSource};
use turbo_coach_backend::state::AppState;

/// Hands out the scripted scores in order, then reports itself unavailable.
pub struct ScriptedClassifier {
    scores: Vec<u8>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(scores: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            scores: scores.to_vec(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Self::new(&[])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(
        &self,
        request: ClassifierRequest<'_>,
    ) -> Result<Evaluation, ClassifierUnavailable> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scores.get(call) {
            Some(&score) => Ok(Evaluation::new(
                score,
                Some("Detail".to_string()),
                format!("Scored '{}' for: {}", request.answer, request.task),
                EvaluationSource::Classifier,
            )),
            None => Err(ClassifierUnavailable::HttpStatus { status: 503 }),
        }
    }
}

pub fn create_test_app(classifier: Arc<ScriptedClassifier>) -> Router {
    create_test_app_with(&GameConfig::default(), classifier)
}

pub fn create_test_app_with(config: &GameConfig, classifier: Arc<ScriptedClassifier>) -> Router {
    let state = AppState::new(config, classifier, true).expect("valid test config");
    build_app(state)
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
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
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
