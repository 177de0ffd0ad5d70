use serde::{Deserialize, Serialize};

pub const MIN_SCORE: u8 = 0;
pub const MAX_SCORE: u8 = 10;

/// Where an evaluation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationSource {
    Gate,
    Classifier,
    Fallback,
}

impl EvaluationSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            EvaluationSource::Gate => "gate",
            EvaluationSource::Classifier => "classifier",
            EvaluationSource::Fallback => "fallback",
        }
    }
}

/// Score and feedback for a single answer. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    pub feedback: String,
    pub source: EvaluationSource,
}

impl Evaluation {
    pub fn new(
        score: u8,
        focus: Option<String>,
        feedback: impl Into<String>,
        source: EvaluationSource,
    ) -> Self {
        Self {
            score: score.min(MAX_SCORE),
            focus,
            feedback: feedback.into(),
            source,
        }
    }
}

/// Whitespace-delimited token count of the trimmed answer.
pub fn token_count(answer: &str) -> usize {
    answer.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_count_ignores_surrounding_whitespace() {
        assert_eq!(token_count("  mi   casa \n grande "), 3);
        assert_eq!(token_count("casa"), 1);
        assert_eq!(token_count("   "), 0);
    }

    #[test]
    fn test_score_is_capped() {
        let eval = Evaluation::new(14, None, "ok", EvaluationSource::Classifier);
        assert_eq!(eval.score, MAX_SCORE);
    }

    #[test]
    fn test_focus_omitted_when_absent() {
        let eval = Evaluation::new(7, None, "Good", EvaluationSource::Fallback);
        let json = serde_json::to_value(&eval).unwrap();
        assert!(json.get("focus").is_none());
        assert_eq!(json["source"], "fallback");
    }
}
