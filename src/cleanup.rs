use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tower_sessions::session_store::ExpiredDeletion;
use tracing::{debug, error, info};

/// How often expired session rows are purged.
pub const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Start the background task that periodically deletes expired sessions from `store`.
pub fn spawn_session_cleanup<Store>(store: Store, every: Duration) -> JoinHandle<()>
where
    Store: ExpiredDeletion,
{
    tokio::spawn(async move {
        info!(
            target: "cleanup",
            interval_secs = every.as_secs(),
            "starting expired session cleanup task"
        );

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match store.delete_expired().await {
                Ok(()) => debug!(target: "cleanup", "expired sessions purged"),
                Err(err) => error!(target: "cleanup", %err, "failed to purge expired sessions"),
            }
        }
    })
}
