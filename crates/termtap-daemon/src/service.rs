use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::sync::MutexGuard;
use tracing::warn;
use uuid::Uuid;

use termtap_core::{
    AsyncDispatch, BufferedSession, CompletionDetector, ControlSignal, ExecuteOptions,
    ExecuteOutput, ReadOutput, SessionStatus, SnapshotSource,
};

use crate::error::ServiceError;
use crate::lock_helpers::acquire_session_lock;

/// The daemon's single buffered session, serialized behind one lock.
///
/// Every buffer operation, read-only ones included, takes the lock so no two
/// operations ever interleave their snapshots. Control signals skip the lock
/// and go straight to the terminal: a sync `execute` of a command that never
/// goes quiet holds the lock until the command is interrupted.
pub struct TerminalService<S: SnapshotSource> {
    session: Mutex<BufferedSession<S>>,
    source: Arc<S>,
    lock_timeout: Duration,
    session_id: String,
    started_at: DateTime<Utc>,
    start_instant: Instant,
}

impl<S: SnapshotSource> TerminalService<S> {
    pub fn new(source: Arc<S>, detector: CompletionDetector, lock_timeout: Duration) -> Self {
        Self {
            session: Mutex::new(BufferedSession::with_detector(Arc::clone(&source), detector)),
            source,
            lock_timeout,
            session_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            start_instant: Instant::now(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn uptime(&self) -> Duration {
        self.start_instant.elapsed()
    }

    async fn lock(&self) -> Result<MutexGuard<'_, BufferedSession<S>>, ServiceError> {
        acquire_session_lock(&self.session, self.lock_timeout)
            .await
            .ok_or_else(|| {
                warn!(
                    timeout_ms = self.lock_timeout.as_millis() as u64,
                    "Session lock timed out"
                );
                ServiceError::LockTimeout(self.lock_timeout)
            })
    }

    pub async fn execute(&self, command: &str, force: bool) -> Result<ExecuteOutput, ServiceError> {
        let mut session = self.lock().await?;
        Ok(session.execute(command, ExecuteOptions { force }).await?)
    }

    pub async fn execute_async(&self, command: &str) -> Result<AsyncDispatch, ServiceError> {
        let mut session = self.lock().await?;
        Ok(session.execute_async(command).await?)
    }

    pub async fn read_output(&self) -> Result<ReadOutput, ServiceError> {
        let mut session = self.lock().await?;
        Ok(session.read_new_output().await?)
    }

    pub async fn has_unread(&self) -> Result<bool, ServiceError> {
        let session = self.lock().await?;
        Ok(session.has_unread_output().await)
    }

    pub async fn peek(&self) -> Result<Option<String>, ServiceError> {
        let session = self.lock().await?;
        Ok(session.peek_unread_output().await)
    }

    pub async fn read_screen(&self, lines: Option<usize>) -> Result<String, ServiceError> {
        let session = self.lock().await?;
        Ok(session.read_screen(lines).await?)
    }

    pub async fn send_control(&self, signal: &str) -> Result<ControlSignal, ServiceError> {
        let signal = ControlSignal::parse(signal)?;
        self.source.send_control(signal).await?;
        Ok(signal)
    }

    pub async fn status(&self) -> Result<SessionStatus, ServiceError> {
        let session = self.lock().await?;
        Ok(session.status())
    }
}
