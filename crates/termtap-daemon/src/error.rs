//! Daemon errors and their JSON-RPC shape.
//!
//! Every failure that reaches a client carries a semantic code, a category,
//! structured context and a suggestion, so callers can react without parsing
//! messages.

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

use termtap_core::{ControlSignalError, SessionError, SourceError};
use termtap_ipc::error_codes::{self, ErrorCategory};
use termtap_terminal::PtyError;

/// Failures of a single RPC operation on the hosted session.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Signal(#[from] ControlSignalError),
    #[error("Session busy: lock not acquired within {}ms", .0.as_millis())]
    LockTimeout(Duration),
}

impl From<SourceError> for ServiceError {
    fn from(err: SourceError) -> Self {
        ServiceError::Session(SessionError::Source(err))
    }
}

impl ServiceError {
    pub fn code(&self) -> i32 {
        match self {
            ServiceError::Session(SessionError::UnreadOutput { .. }) => error_codes::UNREAD_OUTPUT,
            ServiceError::Session(SessionError::Source(SourceError::Closed)) => {
                error_codes::TERMINAL_CLOSED
            }
            ServiceError::Session(SessionError::Source(_)) => error_codes::TERMINAL_ERROR,
            ServiceError::Signal(_) => error_codes::INVALID_SIGNAL,
            ServiceError::LockTimeout(_) => error_codes::LOCK_TIMEOUT,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        error_codes::category_for_code(self.code())
    }

    pub fn context(&self) -> Value {
        match self {
            ServiceError::Session(SessionError::UnreadOutput { output }) => {
                json!({ "output": output })
            }
            ServiceError::Session(SessionError::Source(source)) => match pty_error(source) {
                Some(pty) => pty.context(),
                None => json!({
                    "operation": source_operation(source),
                    "reason": source.to_string()
                }),
            },
            ServiceError::Signal(ControlSignalError::Invalid(signal)) => {
                json!({ "signal": signal })
            }
            ServiceError::LockTimeout(timeout) => {
                json!({ "timeout_ms": timeout.as_millis() as u64 })
            }
        }
    }

    pub fn suggestion(&self) -> String {
        match self {
            ServiceError::Session(SessionError::UnreadOutput { .. }) => {
                "The unread output is in context.output and is now consumed. Retry the command, or pass force to skip unread output."
                    .to_string()
            }
            ServiceError::Session(SessionError::Source(SourceError::Closed)) => {
                "The shell has exited. Run 'termtap shutdown' and start the daemon again.".to_string()
            }
            ServiceError::Session(SessionError::Source(source)) => match pty_error(source) {
                Some(pty) => pty.suggestion(),
                None => "Terminal I/O failed. Retry, or restart the daemon if it persists."
                    .to_string(),
            },
            ServiceError::Signal(_) => {
                "Use a single letter A-Z for Ctrl+<letter>, ']' for the telnet escape, or ESC."
                    .to_string()
            }
            ServiceError::LockTimeout(_) => {
                "Another request is using the session. Retry shortly or raise TERMTAP_LOCK_TIMEOUT."
                    .to_string()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Session(SessionError::Source(source)) => match pty_error(source) {
                Some(pty) => pty.is_retryable(),
                None => error_codes::is_retryable(self.code()),
            },
            _ => error_codes::is_retryable(self.code()),
        }
    }
}

fn pty_error(source: &SourceError) -> Option<&PtyError> {
    match source {
        SourceError::Snapshot(inner) | SourceError::Submission(inner) => inner.downcast_ref(),
        SourceError::Closed => None,
    }
}

fn source_operation(source: &SourceError) -> &'static str {
    match source {
        SourceError::Snapshot(_) => "snapshot",
        SourceError::Submission(_) => "submit",
        SourceError::Closed => "read",
    }
}

/// Daemon startup and lifecycle errors.
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Failed to bind socket: {0}")]
    SocketBind(String),
    #[error("Another daemon instance is already running")]
    AlreadyRunning,
    #[error("Failed to acquire lock: {0}")]
    LockFailed(String),
    #[error("Failed to setup signal handler: {0}")]
    SignalSetup(String),
    #[error("Failed to start terminal: {0}")]
    Terminal(#[from] PtyError),
    #[error("Failed to start runtime: {0}")]
    Runtime(String),
}

impl DaemonError {
    pub fn code(&self) -> i32 {
        match self {
            DaemonError::Terminal(pty) => pty.code(),
            _ => error_codes::DAEMON_ERROR,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::External
    }

    pub fn context(&self) -> Value {
        match self {
            DaemonError::SocketBind(reason) => {
                json!({ "operation": "socket_bind", "reason": reason })
            }
            DaemonError::AlreadyRunning => {
                json!({ "operation": "startup", "reason": "another instance running" })
            }
            DaemonError::LockFailed(reason) => json!({ "operation": "lock", "reason": reason }),
            DaemonError::SignalSetup(reason) => {
                json!({ "operation": "signal_setup", "reason": reason })
            }
            DaemonError::Terminal(pty) => pty.context(),
            DaemonError::Runtime(reason) => json!({ "operation": "runtime", "reason": reason }),
        }
    }

    pub fn suggestion(&self) -> String {
        match self {
            DaemonError::SocketBind(_) => {
                "Check if the socket directory is writable, or set TERMTAP_SOCKET.".to_string()
            }
            DaemonError::AlreadyRunning => {
                "A daemon is already running. Use 'termtap status' to talk to it or 'termtap shutdown' to stop it."
                    .to_string()
            }
            DaemonError::LockFailed(_) => {
                "Lock file issue. Remove the stale lock file next to the socket and retry."
                    .to_string()
            }
            DaemonError::SignalSetup(_) => {
                "Signal handler setup failed. Check system signal configuration.".to_string()
            }
            DaemonError::Terminal(pty) => pty.suggestion(),
            DaemonError::Runtime(_) => {
                "Runtime startup failed. Check system thread limits (ulimit -u).".to_string()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DaemonError::LockFailed(_))
    }
}
