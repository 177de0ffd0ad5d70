use std::sync::Arc;

use turbo_coach_backend::config::{Config, GameConfig};
use turbo_coach_backend::logging::init_tracing;
use turbo_coach_backend::services::classifier::RemoteClassifier;
use turbo_coach_backend::state::AppState;
use turbo_coach_backend::workers::WorkerManager;
use turbo_coach_backend::build_app;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level);

    let game_config = match GameConfig::load() {
        Ok(game_config) => game_config,
        Err(err) => {
            tracing::error!(error = %err, "invalid game configuration");
            std::process::exit(1);
        }
    };

    let classifier = RemoteClassifier::from_env();
    let classifier_configured = classifier.is_available();
    if !classifier_configured {
        tracing::warn!("CLASSIFIER_URL not set, every answer past the gate uses the local fallback");
    }

    let state = match AppState::new(&game_config, Arc::new(classifier), classifier_configured) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "failed to build application state");
            std::process::exit(1);
        }
    };

    let worker_manager = WorkerManager::new(
        state.sessions(),
        config.session_idle_ttl,
        config.session_cleanup_interval,
    );
    worker_manager.start().await;

    let app = build_app(state);

    let addr = config.bind_addr();
    tracing::info!(
        %addr,
        rounds = game_config.rounds,
        default_lang = %game_config.default_lang,
        "turbo-coach listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener failed");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped, initiating graceful shutdown sequence");
    worker_manager.stop().await;
    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
