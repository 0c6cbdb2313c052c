use std::time::Duration;

use tokio::sync::Mutex;
use tokio::sync::MutexGuard;

pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Waits up to `timeout` for the lock. Waiters are served in FIFO order.
pub async fn acquire_session_lock<T>(
    session: &Mutex<T>,
    timeout: Duration,
) -> Option<MutexGuard<'_, T>> {
    tokio::time::timeout(timeout, session.lock()).await.ok()
}
