pub mod config;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod workers;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::GameConfig;
use crate::services::classifier::RemoteClassifier;
use crate::state::AppState;

/// Builds the service from the environment, falling back to the built-in game
/// content when the configured file is unusable.
pub fn create_app() -> axum::Router {
    let config = GameConfig::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "game config rejected, using defaults");
        GameConfig::default()
    });
    let classifier = RemoteClassifier::from_env();
    let configured = classifier.is_available();

    match AppState::new(&config, Arc::new(classifier), configured) {
        Ok(state) => build_app(state),
        Err(err) => {
            tracing::error!(error = %err, "default game config is invalid");
            axum::Router::new()
        }
    }
}

pub fn build_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
