use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::services::rating::RATING_TARGET;

pub struct FileLogGuard {
    _app: WorkerGuard,
    _ratings: WorkerGuard,
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Stdout always. With `ENABLE_FILE_LOGS`, a daily service log plus a separate
/// daily `ratings.log` holding only teacher ratings for offline review.
pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_filter(env_filter(log_level));

    if !file_logging_enabled() {
        tracing_subscriber::registry().with(stdout_layer).init();
        return None;
    }

    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        eprintln!("failed to create log directory {log_dir}: {err}");
        tracing_subscriber::registry().with(stdout_layer).init();
        return None;
    }

    let (app_writer, app_guard) = tracing_appender::non_blocking(RollingFileAppender::new(
        Rotation::DAILY,
        &log_dir,
        "turbo-coach.log",
    ));
    let (rating_writer, rating_guard) = tracing_appender::non_blocking(RollingFileAppender::new(
        Rotation::DAILY,
        &log_dir,
        "ratings.log",
    ));

    let app_layer = fmt::layer()
        .with_writer(app_writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(env_filter(log_level));
    let rating_layer = fmt::layer()
        .with_writer(rating_writer)
        .with_ansi(false)
        .with_filter(Targets::new().with_target(RATING_TARGET, Level::INFO));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(app_layer)
        .with(rating_layer)
        .init();

    Some(FileLogGuard {
        _app: app_guard,
        _ratings: rating_guard,
    })
}
