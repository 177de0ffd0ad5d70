use serde::{Deserialize, Serialize};

use crate::services::evaluation::{token_count, Evaluation, EvaluationSource};
use crate::services::language::LanguageRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateConfig {
    /// Answers with fewer tokens than this are fragments.
    pub min_words: usize,
    pub fragment_score: u8,
    pub missing_verb_score: u8,
    /// Answers with a verb but fewer tokens than this get the elaboration score.
    /// Set to `min_words` to disable the band.
    pub elaboration_min_words: usize,
    pub elaboration_score: u8,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_words: 2,
            fragment_score: 2,
            missing_verb_score: 3,
            elaboration_min_words: 5,
            elaboration_score: 5,
        }
    }
}

/// Cheap local pre-check. `None` means the answer goes on to the classifier.
pub fn structural_gate(
    answer: &str,
    task: &str,
    lang: &str,
    languages: &LanguageRegistry,
    config: &GateConfig,
) -> Option<Evaluation> {
    let words = token_count(answer);
    let example = languages.scaffold(task, lang);

    if words < config.min_words {
        return Some(Evaluation::new(
            config.fragment_score,
            Some("Fragment".to_string()),
            with_example("Make it a full sentence.", example),
            EvaluationSource::Gate,
        ));
    }

    if !languages.has_verb(answer, lang) {
        return Some(Evaluation::new(
            config.missing_verb_score,
            Some("Missing verb".to_string()),
            with_example("Add a verb.", example),
            EvaluationSource::Gate,
        ));
    }

    if words < config.elaboration_min_words {
        return Some(Evaluation::new(
            config.elaboration_score,
            Some("Develop your answer".to_string()),
            with_example(
                "Good start. Add a detail or a reason to develop it.",
                example,
            ),
            EvaluationSource::Gate,
        ));
    }

    None
}

fn with_example(message: &str, example: Option<&str>) -> String {
    match example {
        Some(example) => format!("{message} Example: {example}"),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::language::builtin_languages;

    fn registry() -> LanguageRegistry {
        LanguageRegistry::from_specs(&builtin_languages()).unwrap()
    }

    #[test]
    fn test_single_word_is_fragment() {
        let reg = registry();
        let eval = structural_gate("casa", "Describe your house", "es", &reg, &GateConfig::default())
            .expect("gate should fire");
        assert_eq!(eval.score, 2);
        assert_eq!(eval.focus.as_deref(), Some("Fragment"));
        assert_eq!(
            eval.feedback,
            "Make it a full sentence. Example: Mi casa es pequeña y está en el centro."
        );
        assert_eq!(eval.source, EvaluationSource::Gate);
    }

    #[test]
    fn test_missing_verb() {
        let reg = registry();
        let eval = structural_gate(
            "mi casa grande",
            "Describe your house",
            "es",
            &reg,
            &GateConfig::default(),
        )
        .expect("gate should fire");
        assert_eq!(eval.score, 3);
        assert_eq!(eval.focus.as_deref(), Some("Missing verb"));
        assert!(eval.feedback.starts_with("Add a verb. Example: "));
    }

    #[test]
    fn test_short_answer_with_verb_gets_elaboration_band() {
        let reg = registry();
        let eval = structural_gate("Mi casa es grande", "Describe your house", "es", &reg, &GateConfig::default())
            .expect("gate should fire");
        assert_eq!(eval.score, 5);
        assert_eq!(eval.focus.as_deref(), Some("Develop your answer"));
    }

    #[test]
    fn test_elaboration_band_can_be_disabled() {
        let reg = registry();
        let config = GateConfig {
            elaboration_min_words: 2,
            ..GateConfig::default()
        };
        assert!(structural_gate("Mi casa es grande", "Describe your house", "es", &reg, &config).is_none());
    }

    #[test]
    fn test_full_answer_passes_through() {
        let reg = registry();
        let answer = "Mi casa es grande y está en el centro de la ciudad";
        assert!(structural_gate(answer, "Describe your house", "es", &reg, &GateConfig::default()).is_none());
    }

    #[test]
    fn test_unsupported_language_fails_safe() {
        let reg = registry();
        let eval = structural_gate(
            "Mi casa es grande y está en el centro",
            "Describe your house",
            "xx",
            &reg,
            &GateConfig::default(),
        )
        .expect("gate should fire");
        assert_eq!(eval.score, 3);
        assert_eq!(eval.feedback, "Add a verb.");
    }
}
