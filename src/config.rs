use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::evaluation::MAX_SCORE;
use crate::services::gate::GateConfig;
use crate::services::language::{builtin_languages, LanguageError, LanguageRegistry, LanguageSpec};
use crate::services::pipeline::FallbackConfig;
use crate::services::session::{PromptBank, SessionRules};
use crate::services::tier::TierThresholds;

const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 3600;
const DEFAULT_SESSION_CLEANUP_INTERVAL_SECS: u64 = 300;
/// Gate results stay in the low band whatever the config says.
const GATE_LOW_SCORE_MAX: u8 = 3;
const GATE_MIN_WORDS_FLOOR: usize = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub session_idle_ttl: Duration,
    pub session_cleanup_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let session_idle_ttl = Duration::from_secs(
            env_parse("SESSION_IDLE_TTL_SECS").unwrap_or(DEFAULT_SESSION_IDLE_TTL_SECS),
        );
        let session_cleanup_interval = Duration::from_secs(
            env_parse("SESSION_CLEANUP_INTERVAL_SECS")
                .unwrap_or(DEFAULT_SESSION_CLEANUP_INTERVAL_SECS)
                .max(1),
        );

        Self {
            host,
            port,
            log_level,
            session_idle_ttl,
            session_cleanup_interval,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read game config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse game config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("rounds must be at least 1")]
    InvalidRounds,
    #[error("prompt bank is empty")]
    EmptyPromptBank,
    #[error("default language '{0}' is not configured")]
    UnsupportedDefaultLang(String),
    #[error("tier thresholds must be strictly increasing")]
    TierOrder,
    #[error("{field} must be at most {max}, got {value}")]
    ScoreTooHigh {
        field: &'static str,
        value: u8,
        max: u8,
    },
    #[error("{field} must be at least {min}, got {value}")]
    WordThresholdTooLow {
        field: &'static str,
        value: usize,
        min: usize,
    },
    #[error(transparent)]
    Language(#[from] LanguageError),
}

/// Tunable game content and scoring, loadable from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub rounds: usize,
    pub prompts: Vec<String>,
    pub default_lang: String,
    pub gate: GateConfig,
    pub fallback: FallbackConfig,
    pub tiers: TierThresholds,
    /// Entries here are merged over the built-in languages.
    pub languages: BTreeMap<String, LanguageSpec>,
    pub classifier_deadline_ms: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rounds: 3,
            prompts: default_prompts(),
            default_lang: "es".to_string(),
            gate: GateConfig::default(),
            fallback: FallbackConfig::default(),
            tiers: TierThresholds::default(),
            languages: builtin_languages(),
            classifier_deadline_ms: None,
        }
    }
}

impl GameConfig {
    /// Defaults, then `GAME_CONFIG_PATH`, then `GAME_ROUNDS` / `DEFAULT_LANG`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env_string("GAME_CONFIG_PATH") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(value) = env_string("GAME_ROUNDS") {
            config.rounds = value.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "GAME_ROUNDS",
                value: value.clone(),
            })?;
        }
        if let Some(lang) = env_string("DEFAULT_LANG") {
            config.default_lang = lang;
        }
        config.default_lang = normalize_lang(&config.default_lang);

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut languages = builtin_languages();
        languages.extend(std::mem::take(&mut config.languages));
        config.languages = languages;
        config.default_lang = normalize_lang(&config.default_lang);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rounds == 0 {
            return Err(ConfigError::InvalidRounds);
        }
        self.prompt_bank()?;
        if !self.tiers.is_ordered() {
            return Err(ConfigError::TierOrder);
        }
        self.validate_scoring()?;
        let languages = self.language_registry()?;
        if !languages.supports(&self.default_lang) {
            return Err(ConfigError::UnsupportedDefaultLang(self.default_lang.clone()));
        }
        Ok(())
    }

    fn validate_scoring(&self) -> Result<(), ConfigError> {
        let gate = &self.gate;
        let fallback = &self.fallback;

        at_least("gate.minWords", gate.min_words, GATE_MIN_WORDS_FLOOR)?;
        at_least(
            "gate.elaborationMinWords",
            gate.elaboration_min_words,
            gate.min_words,
        )?;
        at_most("gate.fragmentScore", gate.fragment_score, GATE_LOW_SCORE_MAX)?;
        at_most(
            "gate.missingVerbScore",
            gate.missing_verb_score,
            GATE_LOW_SCORE_MAX,
        )?;
        at_most("gate.elaborationScore", gate.elaboration_score, MAX_SCORE)?;

        at_least("fallback.fullWords", fallback.full_words, fallback.min_words)?;
        at_most("fallback.fragmentScore", fallback.fragment_score, MAX_SCORE)?;
        at_most("fallback.shortScore", fallback.short_score, MAX_SCORE)?;
        at_most("fallback.fullScore", fallback.full_score, MAX_SCORE)?;
        Ok(())
    }

    pub fn language_registry(&self) -> Result<LanguageRegistry, ConfigError> {
        Ok(LanguageRegistry::from_specs(&self.languages)?)
    }

    pub fn prompt_bank(&self) -> Result<PromptBank, ConfigError> {
        PromptBank::new(self.prompts.iter().cloned()).ok_or(ConfigError::EmptyPromptBank)
    }

    pub fn session_rules(&self) -> SessionRules {
        SessionRules {
            rounds: self.rounds,
            tiers: self.tiers.clone(),
        }
    }

    pub fn classifier_deadline(&self) -> Option<Duration> {
        self.classifier_deadline_ms.map(Duration::from_millis)
    }
}

fn default_prompts() -> Vec<String> {
    [
        "Describe your best friend",
        "Describe someone in your family",
        "Describe your house",
        "Describe your town",
        "Describe your favourite subject",
        "Describe your weekend",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn at_most(field: &'static str, value: u8, max: u8) -> Result<(), ConfigError> {
    if value > max {
        return Err(ConfigError::ScoreTooHigh { field, value, max });
    }
    Ok(())
}

fn at_least(field: &'static str, value: usize, min: usize) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::WordThresholdTooLow { field, value, min });
    }
    Ok(())
}

fn normalize_lang(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        config.validate().unwrap();
        assert_eq!(config.rounds, 3);
        assert_eq!(config.prompt_bank().unwrap().len(), 6);
        assert_eq!(config.language_registry().unwrap().codes(), vec!["de", "es", "fr", "ga"]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "rounds": 5,
                "gate": {{ "elaborationMinWords": 2 }},
                "languages": {{
                    "it": {{ "verbForms": ["è", "sono"], "genericExample": "Il mio amico è simpatico." }}
                }}
            }}"#
        )
        .unwrap();

        let config = GameConfig::from_file(file.path()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.rounds, 5);
        assert_eq!(config.gate.elaboration_min_words, 2);
        assert_eq!(config.gate.missing_verb_score, 3);
        assert_eq!(config.prompts.len(), 6);

        let languages = config.language_registry().unwrap();
        assert!(languages.supports("it"));
        assert!(languages.supports("es"));
    }

    #[test]
    fn test_example_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/game.example.json");
        let config = GameConfig::from_file(path).unwrap();
        config.validate().unwrap();
        assert_eq!(config.classifier_deadline(), Some(Duration::from_secs(20)));

        let languages = config.language_registry().unwrap();
        assert!(languages.has_verb("la mia casa è grande", "it"));
        assert!(languages.has_verb("mi casa es grande", "es"));
    }

    #[test]
    fn test_invalid_json_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            GameConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file_reported() {
        assert!(matches!(
            GameConfig::from_file("/nonexistent/turbo-coach.json"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_validation_failures() {
        let config = GameConfig {
            rounds: 0,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRounds)));

        let config = GameConfig {
            prompts: vec!["   ".to_string()],
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyPromptBank)));

        let config = GameConfig {
            default_lang: "xx".to_string(),
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedDefaultLang(_))
        ));

        let config = GameConfig {
            tiers: TierThresholds {
                foundations_max: 8,
                building_max: 6,
                strong_max: 4,
            },
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::TierOrder)));
    }

    fn with_gate(edit: impl FnOnce(&mut GateConfig)) -> GameConfig {
        let mut config = GameConfig::default();
        edit(&mut config.gate);
        config
    }

    fn with_fallback(edit: impl FnOnce(&mut FallbackConfig)) -> GameConfig {
        let mut config = GameConfig::default();
        edit(&mut config.fallback);
        config
    }

    #[test]
    fn test_gate_scores_stay_low() {
        let config = with_gate(|gate| gate.fragment_score = 9);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ScoreTooHigh {
                field: "gate.fragmentScore",
                value: 9,
                max: 3
            })
        ));

        let config = with_gate(|gate| gate.missing_verb_score = 4);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ScoreTooHigh {
                field: "gate.missingVerbScore",
                ..
            })
        ));

        let config = with_gate(|gate| gate.elaboration_score = 11);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ScoreTooHigh {
                field: "gate.elaborationScore",
                max: 10,
                ..
            })
        ));

        with_gate(|gate| {
            gate.fragment_score = 3;
            gate.missing_verb_score = 3;
            gate.elaboration_score = 10;
        })
        .validate()
        .unwrap();
    }

    #[test]
    fn test_gate_word_thresholds_ordered() {
        let config = with_gate(|gate| gate.min_words = 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WordThresholdTooLow {
                field: "gate.minWords",
                ..
            })
        ));

        let config = with_gate(|gate| {
            gate.min_words = 4;
            gate.elaboration_min_words = 3;
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WordThresholdTooLow {
                field: "gate.elaborationMinWords",
                value: 3,
                min: 4
            })
        ));

        // Equal thresholds switch the elaboration band off.
        with_gate(|gate| gate.elaboration_min_words = gate.min_words)
            .validate()
            .unwrap();
    }

    #[test]
    fn test_fallback_bounds() {
        let config = with_fallback(|fallback| {
            fallback.min_words = 6;
            fallback.full_words = 5;
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WordThresholdTooLow {
                field: "fallback.fullWords",
                ..
            })
        ));

        for config in [
            with_fallback(|fallback| fallback.fragment_score = 11),
            with_fallback(|fallback| fallback.short_score = 12),
            with_fallback(|fallback| fallback.full_score = 200),
        ] {
            assert!(matches!(
                config.validate(),
                Err(ConfigError::ScoreTooHigh { max: 10, .. })
            ));
        }
    }

    #[test]
    fn test_out_of_range_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "gate": {{ "fragmentScore": 9 }} }}"#).unwrap();

        let config = GameConfig::from_file(file.path()).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ScoreTooHigh { .. })
        ));
    }

    #[test]
    fn test_file_default_lang_normalized() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "defaultLang": "  FR " }}"#).unwrap();

        let config = GameConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_lang, "fr");
        config.validate().unwrap();
    }

    // The only test in this crate that touches these variables.
    #[test]
    fn test_env_overrides() {
        std::env::remove_var("GAME_CONFIG_PATH");

        std::env::set_var("GAME_ROUNDS", "three");
        std::env::remove_var("DEFAULT_LANG");
        let result = GameConfig::load();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv {
                key: "GAME_ROUNDS",
                ref value
            }) if value == "three"
        ));

        std::env::set_var("GAME_ROUNDS", "4");
        std::env::set_var("DEFAULT_LANG", " DE ");
        let config = GameConfig::load().unwrap();
        assert_eq!(config.rounds, 4);
        assert_eq!(config.default_lang, "de");

        std::env::remove_var("GAME_ROUNDS");
        std::env::remove_var("DEFAULT_LANG");
    }
}
