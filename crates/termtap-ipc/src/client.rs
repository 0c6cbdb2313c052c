use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::socket::socket_path;

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct Request {
    jsonrpc: String,
    id: u64,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// One request per connection, newline-delimited JSON both ways.
pub struct DaemonClient {
    socket: PathBuf,
    read_timeout: Duration,
}

impl DaemonClient {
    pub fn connect() -> Result<Self, ClientError> {
        Self::connect_to(socket_path())
    }

    pub fn connect_to(socket: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let socket = socket.into();
        if !socket.exists() {
            return Err(ClientError::DaemonNotRunning);
        }

        let stream = UnixStream::connect(&socket)?;
        drop(stream);

        Ok(Self {
            socket,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    pub fn is_daemon_running() -> bool {
        is_listening(&socket_path())
    }

    pub fn call(&mut self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let mut stream = UnixStream::connect(&self.socket)?;

        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;

        let request = Request {
            jsonrpc: "2.0".to_string(),
            id: REQUEST_ID.fetch_add(1, Ordering::SeqCst),
            method: method.to_string(),
            params,
        };

        let request_json = serde_json::to_string(&request)?;

        writeln!(stream, "{}", request_json)?;
        stream.flush()?;

        let mut reader = BufReader::new(&stream);
        let mut response_line = String::new();
        reader.read_line(&mut response_line)?;
        if response_line.trim().is_empty() {
            return Err(ClientError::InvalidResponse);
        }

        let response: Response = serde_json::from_str(&response_line)?;

        if let Some(error) = response.error {
            return Err(ClientError::RpcError {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        response.result.ok_or(ClientError::InvalidResponse)
    }
}

fn is_listening(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }

    UnixStream::connect(path).is_ok()
}

pub fn start_daemon_background() -> Result<(), ClientError> {
    use std::fs::OpenOptions;
    use std::process::Command;
    use std::process::Stdio;

    let exe = std::env::current_exe()?;
    let log_path = socket_path().with_extension("log");

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    let stderr = match log_file {
        Some(f) => Stdio::from(f),
        None => Stdio::null(),
    };

    Command::new(exe)
        .arg("daemon")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(stderr)
        .spawn()?;

    for _ in 0..50 {
        std::thread::sleep(Duration::from_millis(100));
        if DaemonClient::is_daemon_running() {
            return Ok(());
        }
    }

    if let Ok(log_content) = std::fs::read_to_string(&log_path) {
        let mut last_lines: Vec<&str> = log_content.lines().rev().take(5).collect();
        last_lines.reverse();
        if !last_lines.is_empty() {
            eprintln!(
                "Daemon failed to start. Recent log output:\n{}",
                last_lines.join("\n")
            );
        }
    }

    Err(ClientError::DaemonNotRunning)
}

pub fn ensure_daemon() -> Result<DaemonClient, ClientError> {
    if !DaemonClient::is_daemon_running() {
        start_daemon_background()?;
    }

    DaemonClient::connect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_to_jsonrpc_2_0() {
        let request = Request {
            jsonrpc: "2.0".to_string(),
            id: 1,
            method: "ping".to_string(),
            params: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"ping\""));
        assert!(!json.contains("\"params\""));
    }

    #[test]
    fn test_response_deserializes_error_with_data() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32010,"message":"Unread","data":{"context":{"output":"x"}}}}"#;
        let response: Response = serde_json::from_str(json).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32010);
        assert_eq!(error.data.unwrap()["context"]["output"], "x");
    }

    #[test]
    fn test_response_deserializes_error_without_data() {
        let json =
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"Invalid Request"}}"#;
        let response: Response = serde_json::from_str(json).unwrap();
        assert!(response.result.is_none());
        assert!(response.error.unwrap().data.is_none());
    }

    #[test]
    fn test_connect_to_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let result = DaemonClient::connect_to(dir.path().join("absent.sock"));
        assert!(matches!(result, Err(ClientError::DaemonNotRunning)));
    }
}
