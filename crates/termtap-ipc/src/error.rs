use serde_json::json;
use serde_json::Value;
use thiserror::Error;

use termtap_common::error_codes::{self, ErrorCategory};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to connect to daemon: {0}")]
    ConnectionFailed(#[from] std::io::Error),

    #[error("Failed to serialize request: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("RPC error ({code}): {message}")]
    RpcError {
        code: i32,
        message: String,
        data: Option<Value>,
    },

    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Invalid response from daemon")]
    InvalidResponse,
}

impl ClientError {
    pub fn code(&self) -> Option<i32> {
        match self {
            ClientError::RpcError { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            ClientError::RpcError { code, data, .. } => Some(
                data.as_ref()
                    .and_then(|d| d.get("category"))
                    .and_then(|c| c.as_str())
                    .and_then(|c| c.parse().ok())
                    .unwrap_or_else(|| error_codes::category_for_code(*code)),
            ),
            ClientError::DaemonNotRunning => Some(ErrorCategory::NotFound),
            ClientError::ConnectionFailed(_) => Some(ErrorCategory::External),
            ClientError::SerializationFailed(_) | ClientError::InvalidResponse => None,
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            ClientError::RpcError { data, .. } => data
                .as_ref()
                .and_then(|d| d.get("suggestion"))
                .and_then(|s| s.as_str())
                .map(String::from),
            ClientError::DaemonNotRunning => {
                Some("Start the daemon with 'termtap daemon'.".to_string())
            }
            ClientError::ConnectionFailed(_) => Some(
                "Check that the socket directory is writable or set TERMTAP_SOCKET.".to_string(),
            ),
            ClientError::SerializationFailed(_) | ClientError::InvalidResponse => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RpcError { code, data, .. } => data
                .as_ref()
                .and_then(|d| d.get("retryable"))
                .and_then(|r| r.as_bool())
                .unwrap_or_else(|| error_codes::is_retryable(*code)),
            ClientError::ConnectionFailed(_) => true,
            _ => false,
        }
    }

    /// Output consumed by a refused `execute`, if that is what this is.
    pub fn unread_output(&self) -> Option<&str> {
        match self {
            ClientError::RpcError {
                code: error_codes::UNREAD_OUTPUT,
                data: Some(data),
                ..
            } => data.get("context")?.get("output")?.as_str(),
            _ => None,
        }
    }

    /// Machine-readable form for `--format json` output.
    pub fn to_json(&self) -> Value {
        let mut output = json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "category": self.category().map(|c| c.as_str()),
                "retryable": self.is_retryable(),
                "suggestion": self.suggestion(),
            }
        });
        if let ClientError::RpcError {
            data: Some(data), ..
        } = self
        {
            if let Some(context) = data.get("context") {
                output["error"]["context"] = context.clone();
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(code: i32, data: Option<Value>) -> ClientError {
        ClientError::RpcError {
            code,
            message: "failed".to_string(),
            data,
        }
    }

    #[test]
    fn test_category_prefers_error_data() {
        let err = rpc(error_codes::GENERIC_ERROR, Some(json!({"category": "timeout"})));
        assert_eq!(err.category(), Some(ErrorCategory::Timeout));
    }

    #[test]
    fn test_category_falls_back_to_code() {
        let err = rpc(error_codes::INVALID_SIGNAL, None);
        assert_eq!(err.category(), Some(ErrorCategory::InvalidInput));
        assert_eq!(
            ClientError::DaemonNotRunning.category(),
            Some(ErrorCategory::NotFound)
        );
        assert_eq!(ClientError::InvalidResponse.category(), None);
    }

    #[test]
    fn test_unread_output_extracted_from_context() {
        let err = rpc(
            error_codes::UNREAD_OUTPUT,
            Some(json!({"category": "busy", "retryable": true, "context": {"output": "done\n$ "}})),
        );
        assert_eq!(err.unread_output(), Some("done\n$ "));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unread_output_absent_for_other_codes() {
        let err = rpc(
            error_codes::TERMINAL_ERROR,
            Some(json!({"context": {"output": "x"}})),
        );
        assert_eq!(err.unread_output(), None);
    }

    #[test]
    fn test_retryable_falls_back_to_code() {
        assert!(rpc(error_codes::LOCK_TIMEOUT, None).is_retryable());
        assert!(!rpc(error_codes::INVALID_SIGNAL, None).is_retryable());
        assert!(!ClientError::DaemonNotRunning.is_retryable());
    }

    #[test]
    fn test_suggestion_from_data() {
        let err = rpc(
            error_codes::TERMINAL_CLOSED,
            Some(json!({"suggestion": "Restart the daemon."})),
        );
        assert_eq!(err.suggestion().as_deref(), Some("Restart the daemon."));
        assert!(ClientError::DaemonNotRunning
            .suggestion()
            .unwrap()
            .contains("termtap daemon"));
    }

    #[test]
    fn test_to_json_carries_context() {
        let err = rpc(
            error_codes::UNREAD_OUTPUT,
            Some(json!({"category": "busy", "context": {"output": "hi"}})),
        );
        let value = err.to_json();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], error_codes::UNREAD_OUTPUT);
        assert_eq!(value["error"]["category"], "busy");
        assert_eq!(value["error"]["context"]["output"], "hi");

        let value = ClientError::DaemonNotRunning.to_json();
        assert!(value["error"]["code"].is_null());
        assert_eq!(value["error"]["category"], "not_found");
    }

    #[test]
    fn test_display() {
        assert_eq!(ClientError::DaemonNotRunning.to_string(), "Daemon not running");
        assert_eq!(
            rpc(-32601, None).to_string(),
            "RPC error (-32601): failed"
        );
    }
}
