//! Semantic error codes for JSON-RPC domain errors.
//!
//! Error codes follow the JSON-RPC 2.0 specification:
//! - -32700 to -32600: Reserved protocol errors
//! - -32000 to -32099: Server errors (we use -32001 to -32020 for domain errors)

// Protocol errors
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

// Session errors
pub const LOCK_TIMEOUT: i32 = -32007;
pub const UNREAD_OUTPUT: i32 = -32010;

// Input errors
pub const INVALID_SIGNAL: i32 = -32005;

// Terminal errors
pub const TERMINAL_ERROR: i32 = -32008;
pub const TERMINAL_CLOSED: i32 = -32009;

// Daemon errors
pub const DAEMON_ERROR: i32 = -32016;

// Legacy generic error
pub const GENERIC_ERROR: i32 = -32000;

/// Error category for programmatic handling by agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Resource not found
    NotFound,
    /// Invalid input parameters
    InvalidInput,
    /// Resource busy, locked, or holding unread state
    Busy,
    /// Internal server error
    Internal,
    /// External dependency failure (PTY, process)
    External,
    /// Operation timed out
    Timeout,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::Busy => "busy",
            ErrorCategory::Internal => "internal",
            ErrorCategory::External => "external",
            ErrorCategory::Timeout => "timeout",
        }
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_found" => Ok(ErrorCategory::NotFound),
            "invalid_input" => Ok(ErrorCategory::InvalidInput),
            "busy" => Ok(ErrorCategory::Busy),
            "internal" => Ok(ErrorCategory::Internal),
            "external" => Ok(ErrorCategory::External),
            "timeout" => Ok(ErrorCategory::Timeout),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns whether an error code represents a retriable operation.
///
/// Unread output is retriable: the caller inspects the payload and re-issues
/// the command, with `force` if it still wants it run.
pub fn is_retryable(code: i32) -> bool {
    matches!(code, LOCK_TIMEOUT | UNREAD_OUTPUT | GENERIC_ERROR)
}

/// Returns the error category for a given error code.
pub fn category_for_code(code: i32) -> ErrorCategory {
    match code {
        METHOD_NOT_FOUND => ErrorCategory::NotFound,
        PARSE_ERROR | INVALID_REQUEST | INVALID_PARAMS | INVALID_SIGNAL => {
            ErrorCategory::InvalidInput
        }
        LOCK_TIMEOUT | UNREAD_OUTPUT => ErrorCategory::Busy,
        TERMINAL_ERROR | TERMINAL_CLOSED | DAEMON_ERROR => ErrorCategory::External,
        _ => ErrorCategory::Internal,
    }
}
