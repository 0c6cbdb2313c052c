//! End-to-end tests of the daemon's socket protocol against a scripted
//! terminal.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;

use termtap_core::test_support::ScriptedSource;
use termtap_core::{CompletionDetector, MockSleeper, DEFAULT_DEBOUNCE};
use termtap_daemon::{DaemonConfig, DaemonServer, Shutdown, TerminalService};
use termtap_ipc::error_codes;

struct TestDaemon {
    _dir: TempDir,
    socket: PathBuf,
    source: Arc<ScriptedSource>,
    shutdown: Arc<Shutdown>,
    handle: JoinHandle<()>,
}

impl TestDaemon {
    fn start(config: DaemonConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("termtap.sock");
        let source = Arc::new(ScriptedSource::new("$ "));
        let detector =
            CompletionDetector::with_sleeper(DEFAULT_DEBOUNCE, Arc::new(MockSleeper::new()));
        let service = TerminalService::new(Arc::clone(&source), detector, Duration::from_secs(1));
        let shutdown = Arc::new(Shutdown::new());
        let server = Arc::new(DaemonServer::new(service, config, Arc::clone(&shutdown)));

        let listener = UnixListener::bind(&socket).unwrap();
        let handle = tokio::spawn(server.serve(listener));

        Self {
            _dir: dir,
            socket,
            source,
            shutdown,
            handle,
        }
    }

    async fn connect(&self) -> Client {
        let stream = UnixStream::connect(&self.socket).await.unwrap();
        let (reader, writer) = stream.into_split();
        Client {
            reader: BufReader::new(reader),
            writer,
            next_id: 1,
        }
    }
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_id: u64,
}

impl Client {
    async fn send_raw(&mut self, line: &str) -> Value {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.read_response().await
    }

    async fn read_response(&mut self) -> Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    async fn call(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        let request = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        let response = self.send_raw(&request.to_string()).await;
        assert_eq!(response["id"], id);
        response
    }
}

fn config() -> DaemonConfig {
    DaemonConfig::default()
        .with_max_connections(4)
        .with_idle_timeout(Duration::from_secs(5))
        .with_max_request_bytes(4096)
}

#[tokio::test]
async fn test_ping_and_health() {
    let daemon = TestDaemon::start(config());
    let mut client = daemon.connect().await;

    let pong = client.call("ping", Value::Null).await;
    assert_eq!(pong["result"]["pong"], true);

    let health = client.call("health", Value::Null).await;
    assert_eq!(health["result"]["status"], "healthy");
    assert_eq!(health["result"]["active_connections"], 1);
}

#[tokio::test]
async fn test_execute_over_socket() {
    let daemon = TestDaemon::start(config());
    daemon.source.on_submit(["$ echo hi\nhi\n$ "]);
    let mut client = daemon.connect().await;

    let response = client.call("execute", json!({"command": "echo hi"})).await;

    assert_eq!(response["result"]["output"], "echo hi\nhi\n$ ");
    assert_eq!(daemon.source.submitted(), vec!["echo hi".to_string()]);
}

#[tokio::test]
async fn test_unread_output_guard_round_trip() {
    let daemon = TestDaemon::start(config());
    let mut client = daemon.connect().await;

    client.call("read_output", Value::Null).await;
    daemon.source.push_frames(["$ make", "$ make\nbuilt"]);
    let dispatched = client.call("execute_async", json!({"command": "make"})).await;
    assert_eq!(dispatched["result"]["dispatched"], true);

    let blocked = client.call("execute", json!({"command": "ls"})).await;
    assert_eq!(blocked["error"]["code"], error_codes::UNREAD_OUTPUT);
    assert_eq!(blocked["error"]["data"]["context"]["output"], "make\nbuilt");

    let unread = client.call("has_unread", Value::Null).await;
    assert_eq!(unread["result"]["has_unread"], false);
}

#[tokio::test]
async fn test_requests_share_one_session_across_connections() {
    let daemon = TestDaemon::start(config());
    let mut first = daemon.connect().await;
    let mut second = daemon.connect().await;

    first.call("execute_async", json!({"command": "sleep 1"})).await;
    let status = second.call("status", Value::Null).await;

    assert_eq!(status["result"]["awaiting_read"], true);
    assert_eq!(status["result"]["pending_command"], "sleep 1");
}

#[tokio::test]
async fn test_malformed_request_keeps_connection_open() {
    let daemon = TestDaemon::start(config());
    let mut client = daemon.connect().await;

    let response = client.send_raw("{not json").await;
    assert_eq!(response["error"]["code"], error_codes::PARSE_ERROR);
    assert_eq!(response["id"], 0);

    let pong = client.call("ping", Value::Null).await;
    assert_eq!(pong["result"]["pong"], true);
}

#[tokio::test]
async fn test_unknown_method() {
    let daemon = TestDaemon::start(config());
    let mut client = daemon.connect().await;

    let response = client.call("resize", Value::Null).await;

    assert_eq!(response["error"]["code"], error_codes::METHOD_NOT_FOUND);
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("resize"));
}

#[tokio::test]
async fn test_oversized_request_closes_connection() {
    let daemon = TestDaemon::start(config().with_max_request_bytes(64));
    let mut client = daemon.connect().await;

    let command = "x".repeat(200);
    let response = client
        .send_raw(&json!({"jsonrpc": "2.0", "id": 1, "method": "execute", "params": {"command": command}}).to_string())
        .await;

    assert_eq!(response["error"]["code"], error_codes::PARSE_ERROR);
    assert!(daemon.source.submitted().is_empty());

    let mut rest = String::new();
    let n = client.reader.read_line(&mut rest).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_connection_limit_rejects_extra_clients() {
    let daemon = TestDaemon::start(config().with_max_connections(1));
    let mut first = daemon.connect().await;
    first.call("ping", Value::Null).await;

    let mut second = daemon.connect().await;
    let rejected = second.read_response().await;

    assert_eq!(rejected["error"]["code"], error_codes::DAEMON_ERROR);
}

#[tokio::test]
async fn test_shutdown_request_stops_serving() {
    let daemon = TestDaemon::start(config());
    let mut client = daemon.connect().await;

    let response = client.call("shutdown", Value::Null).await;
    assert_eq!(response["result"]["stopping"], true);
    assert!(daemon.shutdown.is_triggered());
    drop(client);

    tokio::time::timeout(Duration::from_secs(5), daemon.handle)
        .await
        .expect("serve did not return after shutdown")
        .unwrap();
}
