mod session_cleanup;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use crate::services::session_store::SessionStore;

pub use session_cleanup::cleanup_idle_sessions;

pub struct WorkerManager {
    shutdown_tx: broadcast::Sender<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    sessions: Arc<SessionStore>,
    idle_ttl: Duration,
    interval: Duration,
}

impl WorkerManager {
    pub fn new(sessions: Arc<SessionStore>, idle_ttl: Duration, interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
            sessions,
            idle_ttl,
            interval,
        }
    }

    pub async fn start(&self) {
        info!(
            idle_ttl_secs = self.idle_ttl.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Starting session cleanup worker"
        );

        let sessions = Arc::clone(&self.sessions);
        let idle_ttl = self.idle_ttl;
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => cleanup_idle_sessions(&sessions, idle_ttl),
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        self.handles.lock().await.push(handle);
    }

    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(());
        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            let _ = handle.await;
        }
        info!("Workers stopped");
    }
}
