use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::services::session_store::SessionStore;

pub fn cleanup_idle_sessions(sessions: &SessionStore, idle_ttl: Duration) {
    let start = Instant::now();
    debug!("Starting session cleanup cycle");

    let expired = sessions.purge_idle(idle_ttl);
    if expired == 0 {
        debug!(remaining = sessions.len(), "No idle sessions to remove");
        return;
    }

    info!(
        expired_sessions = expired,
        remaining = sessions.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Session cleanup completed"
    );
}
