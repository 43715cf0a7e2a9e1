//! Background task that periodically purges expired sessions.
//!
//! Expired sessions are already rejected on use; this only keeps the
//! session store from growing without bound.

use std::sync::Arc;

use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::UserService;
use crate::shared::shutdown::ShutdownSignal;

/// Start the session cleanup background task.
///
/// Runs every `check_interval_secs` until `shutdown` fires.
pub fn start_session_cleanup_task(
    users: Arc<UserService>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            "🧹 Session cleanup task started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match users.purge_expired_sessions().await {
                        Ok(0) => debug!("No expired sessions"),
                        Ok(count) => info!(count, "Purged expired sessions"),
                        Err(e) => warn!(error = %e, "Session cleanup error"),
                    }
                }
                _ = shutdown.wait() => {
                    info!("🧹 Session cleanup task shutting down");
                    break;
                }
            }
        }

        info!("🧹 Session cleanup task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RepositoryProvider, Session};
    use crate::infrastructure::crypto::JwtConfig;
    use crate::infrastructure::InMemoryRepositoryProvider;

    #[tokio::test]
    async fn purges_and_stops_on_shutdown() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let mut stale = Session::new("u1", chrono::Duration::hours(1));
        stale.expires_at = stale.created_at - chrono::Duration::seconds(1);
        repos.sessions().create(stale.clone()).await.unwrap();

        let users = Arc::new(UserService::new(repos.clone(), JwtConfig::default()));
        let shutdown = ShutdownSignal::new();
        let handle = start_session_cleanup_task(users, shutdown.clone(), 3600);

        // First tick fires immediately
        for _ in 0..50 {
            if repos.sessions().find_by_id(&stale.id).await.unwrap().is_none() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(repos.sessions().find_by_id(&stale.id).await.unwrap().is_none());

        shutdown.trigger();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("task should stop")
            .unwrap();
    }
}
