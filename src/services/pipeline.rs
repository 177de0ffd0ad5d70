use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::services::classifier::{Classifier, ClassifierRequest, ClassifierUnavailable};
use crate::services::evaluation::{token_count, Evaluation, EvaluationSource};
use crate::services::gate::{structural_gate, GateConfig};
use crate::services::language::LanguageRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackConfig {
    pub min_words: usize,
    pub fragment_score: u8,
    pub full_words: usize,
    pub short_score: u8,
    pub full_score: u8,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            min_words: 2,
            fragment_score: 2,
            full_words: 5,
            short_score: 5,
            full_score: 7,
        }
    }
}

/// Local result used when the classifier cannot answer. Depends only on length.
pub fn fallback_evaluation(answer: &str, config: &FallbackConfig) -> Evaluation {
    let words = token_count(answer);

    if words < config.min_words {
        Evaluation::new(
            config.fragment_score,
            Some("Fragment".to_string()),
            "Write a full sentence about the task.",
            EvaluationSource::Fallback,
        )
    } else if words < config.full_words {
        Evaluation::new(
            config.short_score,
            Some("Length".to_string()),
            "Add more detail: say what it is like and why.",
            EvaluationSource::Fallback,
        )
    } else {
        Evaluation::new(
            config.full_score,
            Some("Elaboration".to_string()),
            "Good effort. Extend your answer with another detail or a reason.",
            EvaluationSource::Fallback,
        )
    }
}

/// Gate, then classifier, then fallback. Always produces an evaluation.
#[derive(Clone)]
pub struct EvaluationPipeline {
    languages: Arc<LanguageRegistry>,
    gate: GateConfig,
    fallback: FallbackConfig,
    classifier: Arc<dyn Classifier>,
    deadline: Option<Duration>,
}

impl EvaluationPipeline {
    pub fn new(
        languages: Arc<LanguageRegistry>,
        gate: GateConfig,
        fallback: FallbackConfig,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            languages,
            gate,
            fallback,
            classifier,
            deadline: None,
        }
    }

    /// Treat a classifier call that outlives `deadline` as unavailable.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    pub async fn evaluate(&self, answer: &str, task: &str, lang: &str) -> Evaluation {
        let answer = answer.trim();

        if let Some(gated) = structural_gate(answer, task, lang, &self.languages, &self.gate) {
            debug!(score = gated.score, focus = ?gated.focus, "answer gated locally");
            return gated;
        }

        match self.classify(answer, task, lang).await {
            Ok(evaluation) => {
                debug!(score = evaluation.score, "classifier evaluation received");
                evaluation
            }
            Err(err) => {
                warn!(error = %err, "classifier unavailable, using local fallback");
                fallback_evaluation(answer, &self.fallback)
            }
        }
    }

    async fn classify(
        &self,
        answer: &str,
        task: &str,
        lang: &str,
    ) -> Result<Evaluation, ClassifierUnavailable> {
        let request = ClassifierRequest { task, answer, lang };
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.classifier.classify(request))
                .await
                .unwrap_or_else(|_| {
                    Err(ClassifierUnavailable::Transport(format!(
                        "no response within {}ms",
                        deadline.as_millis()
                    )))
                }),
            None => self.classifier.classify(request).await,
        }
    }
}
