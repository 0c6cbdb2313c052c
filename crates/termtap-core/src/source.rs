use async_trait::async_trait;
use thiserror::Error;

use crate::control::ControlSignal;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures reported by the terminal driver, passed through untouched.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to capture terminal buffer: {0}")]
    Snapshot(#[source] BoxError),
    #[error("failed to submit to terminal: {0}")]
    Submission(#[source] BoxError),
    #[error("terminal closed")]
    Closed,
}

/// The terminal being driven.
///
/// `snapshot` must be idempotent and side-effect free. `submit` resolves once
/// the terminal has reacted to the command (accepted or started it), not
/// when the command finishes. `dispatch` resolves as soon as the command has
/// been written, so calls that complete in order reach the terminal in order.
///
/// `send_control` must not wait on an in-flight `submit`.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    async fn snapshot(&self) -> Result<String, SourceError>;

    async fn submit(&self, command: &str) -> Result<(), SourceError>;

    async fn dispatch(&self, command: &str) -> Result<(), SourceError>;

    async fn send_control(&self, signal: ControlSignal) -> Result<(), SourceError>;
}
