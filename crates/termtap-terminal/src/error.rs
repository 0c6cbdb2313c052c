//! PTY errors with structured context for RPC clients.

use serde_json::{json, Value};
use termtap_common::error_codes::{self, ErrorCategory};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("Failed to open PTY: {0}")]
    Open(String),
    #[error("Failed to spawn shell: {0}")]
    Spawn(String),
    #[error("Failed to write to PTY: {0}")]
    Write(String),
    #[error("Failed to read from PTY: {0}")]
    Read(String),
}

impl PtyError {
    /// All PTY failures share TERMINAL_ERROR; the failing step is in `context()`.
    pub fn code(&self) -> i32 {
        error_codes::TERMINAL_ERROR
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::External
    }

    pub fn context(&self) -> Value {
        json!({
            "operation": self.operation(),
            "reason": self.reason(),
        })
    }

    pub fn suggestion(&self) -> String {
        match self {
            PtyError::Open(_) => {
                "PTY allocation failed. Check system resource limits (ulimit -n) or restart the daemon."
                    .to_string()
            }
            PtyError::Spawn(reason) => {
                if reason.contains("not found") || reason.contains("No such file") {
                    "Shell not found. Set TERMTAP_SHELL to an existing shell.".to_string()
                } else if reason.contains("Permission denied") {
                    "Permission denied. Check the shell's file permissions.".to_string()
                } else {
                    "Shell spawn failed. Check TERMTAP_SHELL and its arguments.".to_string()
                }
            }
            PtyError::Write(_) | PtyError::Read(_) => {
                "Terminal I/O failed. The shell may have exited; run 'termtap status' to check."
                    .to_string()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, PtyError::Read(_) | PtyError::Write(_))
    }

    pub fn operation(&self) -> &'static str {
        match self {
            PtyError::Open(_) => "open",
            PtyError::Spawn(_) => "spawn",
            PtyError::Write(_) => "write",
            PtyError::Read(_) => "read",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            PtyError::Open(r) | PtyError::Spawn(r) | PtyError::Write(r) | PtyError::Read(r) => r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pty_error_code_and_category() {
        let err = PtyError::Open("no ptys".into());
        assert_eq!(err.code(), error_codes::TERMINAL_ERROR);
        assert_eq!(err.category(), ErrorCategory::External);
    }

    #[test]
    fn test_pty_error_context() {
        let ctx = PtyError::Spawn("command not found".into()).context();
        assert_eq!(ctx["operation"], "spawn");
        assert_eq!(ctx["reason"], "command not found");
    }

    #[test]
    fn test_spawn_suggestion_mentions_shell_variable() {
        let err = PtyError::Spawn("No such file or directory".into());
        assert!(err.suggestion().contains("TERMTAP_SHELL"));
        let err = PtyError::Spawn("Permission denied".into());
        assert!(err.suggestion().contains("Permission"));
    }

    #[test]
    fn test_io_errors_are_retryable() {
        assert!(PtyError::Read("eio".into()).is_retryable());
        assert!(PtyError::Write("broken pipe".into()).is_retryable());
        assert!(!PtyError::Open("failed".into()).is_retryable());
        assert!(!PtyError::Spawn("failed".into()).is_retryable());
    }
}
