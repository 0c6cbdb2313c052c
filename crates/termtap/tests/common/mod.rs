//! Scripted daemon for driving the CLI binary without a shell.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use assert_cmd::Command;
use serde_json::{json, Value};
use tempfile::TempDir;

pub fn termtap_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("termtap"))
}

#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(Value),
    Error {
        code: i32,
        message: String,
        data: Option<Value>,
    },
    /// Accept the request and never answer it.
    NoReply,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub params: Option<Value>,
}

pub struct MockDaemon {
    _temp_dir: TempDir,
    socket_path: PathBuf,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
}

impl MockDaemon {
    pub fn start() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let socket_path = temp_dir.path().join("termtap.sock");
        let listener = UnixListener::bind(&socket_path).expect("Failed to bind mock socket");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(Mutex::new(default_responses()));

        let thread_requests = Arc::clone(&requests);
        let thread_responses = Arc::clone(&responses);
        thread::spawn(move || {
            let mut unanswered = Vec::new();
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut line = String::new();
                let mut reader = BufReader::new(&stream);
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    continue;
                }

                let request: Value = serde_json::from_str(&line).expect("CLI sent invalid JSON");
                let method = request["method"].as_str().unwrap_or_default().to_string();
                thread_requests.lock().unwrap().push(RecordedRequest {
                    method: method.clone(),
                    params: request.get("params").cloned(),
                });

                let response = match thread_responses.lock().unwrap().get(&method).cloned() {
                    Some(MockResponse::NoReply) => {
                        drop(reader);
                        unanswered.push(stream);
                        continue;
                    }
                    Some(MockResponse::Success(result)) => {
                        json!({"jsonrpc": "2.0", "id": request["id"], "result": result})
                    }
                    Some(MockResponse::Error {
                        code,
                        message,
                        data,
                    }) => json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "error": {"code": code, "message": message, "data": data}
                    }),
                    None => json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "error": {"code": -32601, "message": format!("Method not found: {}", method)}
                    }),
                };
                let _ = writeln!(stream, "{}", response);
            }
        });

        Self {
            _temp_dir: temp_dir,
            socket_path,
            requests,
            responses,
        }
    }

    pub fn set_response(&self, method: &str, response: MockResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(method.to_string(), response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self, method: &str) -> Option<RecordedRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.method == method)
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = termtap_cmd();
        cmd.env("TERMTAP_SOCKET", &self.socket_path);
        cmd.env("TERMTAP_NO_AUTOSTART", "1");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.cmd().args(args).assert()
    }
}

fn default_responses() -> HashMap<String, MockResponse> {
    let mut responses = HashMap::new();
    responses.insert(
        "ping".to_string(),
        MockResponse::Success(json!({ "pong": true })),
    );
    responses.insert(
        "execute".to_string(),
        MockResponse::Success(json!({
            "output": "echo hi\nhi\n$ ",
            "buffer": "$ echo hi\nhi\n$ "
        })),
    );
    responses.insert(
        "execute_async".to_string(),
        MockResponse::Success(json!({ "dispatched": true, "command": "make" })),
    );
    responses.insert(
        "read_output".to_string(),
        MockResponse::Success(json!({ "output": "built\n$ ", "is_complete": true })),
    );
    responses.insert(
        "peek".to_string(),
        MockResponse::Success(json!({ "output": null })),
    );
    responses.insert(
        "has_unread".to_string(),
        MockResponse::Success(json!({ "has_unread": false })),
    );
    responses.insert(
        "read_screen".to_string(),
        MockResponse::Success(json!({ "screen": "line 9\nline 10" })),
    );
    responses.insert(
        "send_control".to_string(),
        MockResponse::Success(json!({ "sent": true, "signal": "Ctrl+C", "code": 3 })),
    );
    responses.insert(
        "status".to_string(),
        MockResponse::Success(json!({
            "session_id": "5f0c6a8e-1d2b-4f3a-9c7d-0e1f2a3b4c5d",
            "awaiting_read": false,
            "pending_command": null,
            "pending_for_ms": null,
            "last_read_age_ms": 1500,
            "last_read_len": 42
        })),
    );
    responses.insert(
        "health".to_string(),
        MockResponse::Success(json!({
            "status": "healthy",
            "pid": 4242,
            "uptime_ms": 61000,
            "session_id": "5f0c6a8e-1d2b-4f3a-9c7d-0e1f2a3b4c5d",
            "started_at": "2026-01-01T00:00:00+00:00",
            "version": "0.1.0",
            "active_connections": 1
        })),
    );
    responses.insert(
        "shutdown".to_string(),
        MockResponse::Success(json!({ "stopping": true })),
    );
    responses
}
