use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::{ConfigError, GameConfig};
use crate::services::classifier::Classifier;
use crate::services::pipeline::EvaluationPipeline;
use crate::services::session_store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    default_lang: Arc<str>,
    pipeline: Arc<EvaluationPipeline>,
    sessions: Arc<SessionStore>,
    classifier_configured: bool,
}

impl AppState {
    pub fn new(
        config: &GameConfig,
        classifier: Arc<dyn Classifier>,
        classifier_configured: bool,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let languages = Arc::new(config.language_registry()?);
        let pipeline = EvaluationPipeline::new(
            languages,
            config.gate.clone(),
            config.fallback.clone(),
            classifier,
        )
        .with_deadline(config.classifier_deadline());
        let sessions = SessionStore::new(Arc::new(config.prompt_bank()?), config.session_rules());

        Ok(Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            default_lang: Arc::from(config.default_lang.trim().to_ascii_lowercase()),
            pipeline: Arc::new(pipeline),
            sessions: Arc::new(sessions),
            classifier_configured,
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    pub fn pipeline(&self) -> Arc<EvaluationPipeline> {
        Arc::clone(&self.pipeline)
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.sessions)
    }

    pub fn classifier_configured(&self) -> bool {
        self.classifier_configured
    }
}
