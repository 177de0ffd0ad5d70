use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::services::evaluation::{Evaluation, EvaluationSource, MAX_SCORE};

const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_MAX_RETRIES: usize = 2;
const MAX_RETRIES: usize = 5;
const BASE_BACKOFF_MS: u64 = 200;
const MAX_BACKOFF_MS: u64 = 5_000;

#[derive(Debug, Clone, Serialize)]
pub struct ClassifierRequest<'a> {
    pub task: &'a str,
    pub answer: &'a str,
    pub lang: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct ClassifierResponse {
    score: f64,
    #[serde(default)]
    focus: Option<String>,
    feedback: String,
}

/// The remote classifier could not produce an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierUnavailable {
    #[error("classifier endpoint not configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP {status}")]
    HttpStatus { status: u16 },
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        request: ClassifierRequest<'_>,
    ) -> Result<Evaluation, ClassifierUnavailable>;
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub endpoint: Option<String>,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ClassifierConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env_string("CLASSIFIER_URL"),
            timeout: Duration::from_millis(
                env_string("CLASSIFIER_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
            max_retries: env_string("CLASSIFIER_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_RETRIES),
        }
    }
}

/// HTTP adapter for the external scoring service.
#[derive(Clone)]
pub struct RemoteClassifier {
    config: ClassifierConfig,
    client: reqwest::Client,
}

impl RemoteClassifier {
    /// `max_retries` is capped at 5.
    pub fn new(mut config: ClassifierConfig) -> Self {
        if config.max_retries > MAX_RETRIES {
            warn!(
                requested = config.max_retries,
                max = MAX_RETRIES,
                "classifier retries capped"
            );
            config.max_retries = MAX_RETRIES;
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(ClassifierConfig::from_env())
    }

    pub fn is_available(&self) -> bool {
        self.endpoint().is_some()
    }

    pub fn max_retries(&self) -> usize {
        self.config.max_retries
    }

    fn endpoint(&self) -> Option<&str> {
        self.config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    async fn post_with_retry(
        &self,
        url: &str,
        request: &ClassifierRequest<'_>,
    ) -> Result<ClassifierResponse, ClassifierUnavailable> {
        let max_retries = self.config.max_retries;

        let mut retry = 0;
        loop {
            let err = match self.client.post(url).json(request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp
                            .bytes()
                            .await
                            .map_err(|e| ClassifierUnavailable::Transport(e.to_string()))?;
                        return serde_json::from_slice(&bytes).map_err(|e| {
                            tracing::error!(
                                "Failed to parse classifier response JSON: {}. Body: {}",
                                e,
                                String::from_utf8_lossy(&bytes)
                            );
                            ClassifierUnavailable::Malformed(e.to_string())
                        });
                    }
                    let err = ClassifierUnavailable::HttpStatus {
                        status: status.as_u16(),
                    };
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                Err(e) => ClassifierUnavailable::Transport(e.to_string()),
            };

            if retry >= max_retries {
                return Err(err);
            }
            warn!(retry, error = %err, "classifier request failed, retrying");
            sleep(backoff_delay(retry)).await;
            retry += 1;
        }
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(
        &self,
        request: ClassifierRequest<'_>,
    ) -> Result<Evaluation, ClassifierUnavailable> {
        let url = self
            .endpoint()
            .ok_or(ClassifierUnavailable::NotConfigured)?
            .to_string();
        let response = self.post_with_retry(&url, &request).await?;
        normalize(response)
    }
}

fn normalize(response: ClassifierResponse) -> Result<Evaluation, ClassifierUnavailable> {
    if !response.score.is_finite() {
        return Err(ClassifierUnavailable::Malformed("score is not finite".into()));
    }
    let feedback = response.feedback.trim();
    if feedback.is_empty() {
        return Err(ClassifierUnavailable::Malformed("empty feedback".into()));
    }

    let score = response.score.round().clamp(0.0, f64::from(MAX_SCORE)) as u8;
    let focus = response
        .focus
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());

    Ok(Evaluation::new(score, focus, feedback, EvaluationSource::Classifier))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn backoff_delay(retry: usize) -> Duration {
    let factor = u32::try_from(retry)
        .ok()
        .and_then(|shift| 1u64.checked_shl(shift))
        .unwrap_or(u64::MAX);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}
