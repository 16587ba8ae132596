//! Background task that ends idle sessions with reason `timeout`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tutor_core::repository::session::SessionRepository;
use tutor_core::session::SessionManager;

/// Spawn the idle-session sweeper.
///
/// Runs one sweep immediately, then every `every`, until `cancel` fires.
pub fn spawn_idle_sweeper<S>(
    manager: Arc<SessionManager<S>>,
    idle_for: Duration,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    S: SessionRepository + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            idle_minutes = idle_for.as_secs() / 60,
            interval_secs = every.as_secs(),
            "Idle session sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match manager.expire_idle_sessions(idle_for).await {
                Ok(expired) if expired.is_empty() => debug!("No idle sessions"),
                Ok(expired) => info!(count = expired.len(), "Expired idle sessions"),
                Err(e) => warn!(error = %e, "Idle session sweep failed"),
            }
        }

        debug!("Idle session sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_infra::sqlite::pool::{DatabasePool, database_url};
    use tutor_infra::sqlite::session::SqliteSessionRepository;
    use tutor_types::session::{EndReason, Session};
    use tutor_types::time;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_sweeper_ends_idle_sessions_until_cancelled() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = DatabasePool::new(&database_url(tmp.path())).await.unwrap();
        let repo = SqliteSessionRepository::new(pool);

        let idle = Session::start(Uuid::now_v7(), None, time::now() - chrono::Duration::hours(3));
        let fresh = Session::start(Uuid::now_v7(), None, time::now());
        repo.create(&idle).await.unwrap();
        repo.create(&fresh).await.unwrap();

        let manager = Arc::new(SessionManager::new(repo));
        let cancel = CancellationToken::new();
        let handle = spawn_idle_sweeper(
            manager.clone(),
            Duration::from_secs(3_600),
            Duration::from_millis(20),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        handle.await.unwrap();

        let idle = manager.get_session(&idle.id).await.unwrap();
        assert!(!idle.is_active);
        assert_eq!(idle.end_reason, Some(EndReason::Timeout));
        assert!(manager.get_session(&fresh.id).await.unwrap().is_active);
    }
}
