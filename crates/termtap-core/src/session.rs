//! The buffered session: a read cursor over one terminal's buffer.
//!
//! Every operation snapshots the whole buffer and measures it against the
//! last snapshot the caller was shown. Output from a command started with
//! [`BufferedSession::execute_async`] must be drained before another command
//! may run; [`BufferedSession::execute`] refuses (and hands the pending output
//! back inside the error) unless forced.
//!
//! Not internally synchronized. Hosts with concurrent callers serialize all
//! operations on one session behind a single lock. Control signals are not
//! session operations: they go straight to the [`SnapshotSource`], so they
//! still get through while a command holds the session.

use std::mem;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::completion::CompletionDetector;
use crate::diff::extract_new_output;
use crate::error::SessionError;
use crate::source::{SnapshotSource, SourceError};

/// The one in-flight asynchronous command.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub command: String,
    pub dispatched_at: Instant,
    /// Buffer as it was before dispatch. Kept for introspection only; deltas
    /// are always measured from the read cursor.
    pub before_buffer: String,
}

#[derive(Debug, Clone)]
pub enum ReadState {
    Idle,
    AwaitingRead(PendingCommand),
}

#[derive(Debug)]
struct BufferState {
    last_read: String,
    last_read_at: Instant,
    read: ReadState,
}

impl BufferState {
    fn new() -> Self {
        Self {
            last_read: String::new(),
            last_read_at: Instant::now(),
            read: ReadState::Idle,
        }
    }

    fn advance(&mut self, snapshot: String) {
        self.last_read = snapshot;
        self.last_read_at = Instant::now();
    }

    fn settle(&mut self) -> Option<PendingCommand> {
        match mem::replace(&mut self.read, ReadState::Idle) {
            ReadState::AwaitingRead(pending) => Some(pending),
            ReadState::Idle => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Run even though unread output is pending; that output is skipped.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteOutput {
    pub output: String,
    pub buffer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsyncDispatch {
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadOutput {
    pub output: String,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub awaiting_read: bool,
    pub pending_command: Option<String>,
    pub pending_for_ms: Option<u64>,
    pub last_read_age_ms: u64,
    pub last_read_len: usize,
}

pub struct BufferedSession<S: SnapshotSource> {
    source: Arc<S>,
    detector: CompletionDetector,
    state: BufferState,
}

impl<S: SnapshotSource> BufferedSession<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self::with_detector(source, CompletionDetector::default())
    }

    pub fn with_detector(source: Arc<S>, detector: CompletionDetector) -> Self {
        Self {
            source,
            detector,
            state: BufferState::new(),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn read_state(&self) -> &ReadState {
        &self.state.read
    }

    pub fn is_awaiting_read(&self) -> bool {
        matches!(self.state.read, ReadState::AwaitingRead(_))
    }

    pub fn pending_command(&self) -> Option<&PendingCommand> {
        match &self.state.read {
            ReadState::AwaitingRead(pending) => Some(pending),
            ReadState::Idle => None,
        }
    }

    pub fn last_read(&self) -> &str {
        &self.state.last_read
    }

    pub fn last_read_at(&self) -> Instant {
        self.state.last_read_at
    }

    /// Runs `command` and returns what it printed.
    ///
    /// With unread output pending and no `force`, nothing is submitted: the
    /// pending output is consumed and returned as
    /// [`SessionError::UnreadOutput`].
    #[tracing::instrument(skip(self, command), fields(command = %command, force = options.force))]
    pub async fn execute(
        &mut self,
        command: &str,
        options: ExecuteOptions,
    ) -> Result<ExecuteOutput, SessionError> {
        if self.is_awaiting_read() && !options.force {
            let current = self.source.snapshot().await?;
            let output = extract_new_output(&self.state.last_read, &current);
            self.state.advance(current);
            self.state.settle();
            debug!(unread_len = output.len(), "refused command, unread output pending");
            return Err(SessionError::UnreadOutput { output });
        }

        let before = self.source.snapshot().await?;
        self.source.submit(command).await?;
        let after = self.source.snapshot().await?;

        let output = extract_new_output(&before, &after);
        self.state.advance(after.clone());
        if let Some(skipped) = self.state.settle() {
            debug!(pending = %skipped.command, "forced execute skipped pending output");
        }

        Ok(ExecuteOutput {
            output,
            buffer: after,
        })
    }

    /// Starts `command` without waiting for it.
    ///
    /// The command is written before this returns, so a later `execute`
    /// always reaches the terminal after it. Nothing waits for the terminal
    /// to react. Only the pre-dispatch snapshot can fail this call; a failed
    /// write is logged and dropped, and shows up to the caller as reads with
    /// no new output.
    #[tracing::instrument(skip(self, command), fields(command = %command))]
    pub async fn execute_async(&mut self, command: &str) -> Result<AsyncDispatch, SessionError> {
        let before_buffer = self.source.snapshot().await?;

        if let ReadState::AwaitingRead(previous) = &self.state.read {
            debug!(previous = %previous.command, "replacing pending command");
        }
        self.state.read = ReadState::AwaitingRead(PendingCommand {
            command: command.to_string(),
            dispatched_at: Instant::now(),
            before_buffer,
        });

        if let Err(e) = self.source.dispatch(command).await {
            ignore_dispatch_failure(command, &e);
        }

        Ok(AsyncDispatch {
            command: command.to_string(),
        })
    }

    /// Returns output produced since the last read and advances the cursor.
    ///
    /// `is_complete` reports whether the buffer held still for one debounce
    /// window; when it did, any pending command is considered finished. Once
    /// the cursor has moved the delta is always returned: a failed detector
    /// sample reports `is_complete: false`.
    #[tracing::instrument(skip(self))]
    pub async fn read_new_output(&mut self) -> Result<ReadOutput, SessionError> {
        let current = self.source.snapshot().await?;
        let output = extract_new_output(&self.state.last_read, &current);
        self.state.advance(current);

        let is_complete = match self.detector.is_complete(self.source.as_ref()).await {
            Ok(complete) => complete,
            Err(e) => {
                debug!(error = %e, "completion check failed, reporting incomplete");
                false
            }
        };
        if is_complete {
            if let Some(done) = self.state.settle() {
                debug!(
                    command = %done.command,
                    elapsed_ms = done.dispatched_at.elapsed().as_millis() as u64,
                    "pending command settled"
                );
            }
        }

        Ok(ReadOutput {
            output,
            is_complete,
        })
    }

    /// Whether the buffer moved past the cursor while output is pending.
    /// A failed snapshot reads as `false`.
    pub async fn has_unread_output(&self) -> bool {
        if !self.is_awaiting_read() {
            return false;
        }
        match self.source.snapshot().await {
            Ok(current) => current != self.state.last_read,
            Err(_) => false,
        }
    }

    /// The pending delta, without consuming it.
    ///
    /// `None` means no output is pending (or the buffer could not be read);
    /// `Some("")` means output is pending but nothing has appeared yet.
    pub async fn peek_unread_output(&self) -> Option<String> {
        if !self.is_awaiting_read() {
            return None;
        }
        let current = self.source.snapshot().await.ok()?;
        Some(extract_new_output(&self.state.last_read, &current))
    }

    /// The last `lines` lines of the buffer (all of it for `None`). Leaves
    /// the cursor alone.
    pub async fn read_screen(&self, lines: Option<usize>) -> Result<String, SessionError> {
        let buffer = self.source.snapshot().await?;
        Ok(match lines {
            Some(count) => tail_lines(&buffer, count),
            None => buffer,
        })
    }

    pub fn status(&self) -> SessionStatus {
        let pending = self.pending_command();
        SessionStatus {
            awaiting_read: pending.is_some(),
            pending_command: pending.map(|p| p.command.clone()),
            pending_for_ms: pending.map(|p| p.dispatched_at.elapsed().as_millis() as u64),
            last_read_age_ms: self.state.last_read_at.elapsed().as_millis() as u64,
            last_read_len: self.state.last_read.len(),
        }
    }
}

/// Async submissions are fire-and-forget; a failed write is not an error.
fn ignore_dispatch_failure(command: &str, error: &SourceError) {
    debug!(command, error = %error, "async dispatch failed");
}

fn tail_lines(buffer: &str, count: usize) -> String {
    let lines: Vec<&str> = buffer.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
