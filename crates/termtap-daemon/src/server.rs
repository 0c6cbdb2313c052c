use std::fs::OpenOptions;
use std::io;
use std::io::Write as _;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn, Instrument};

use termtap_core::{CompletionDetector, SnapshotSource};
use termtap_ipc::error_codes;
use termtap_ipc::{lock_path, socket_path, RpcRequest, RpcResponse};
use termtap_terminal::PtyTerminal;

use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::handlers;
use crate::handlers::common::handler_span;
use crate::service::TerminalService;
use crate::shutdown::Shutdown;
use crate::signal_handler::SignalHandler;

const WRITE_TIMEOUT: Duration = Duration::from_secs(30);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

enum ReadError {
    SizeLimit { max_bytes: usize },
    Io(io::Error),
}

pub struct DaemonServer<S: SnapshotSource> {
    service: TerminalService<S>,
    config: DaemonConfig,
    shutdown: Arc<Shutdown>,
    active_connections: AtomicUsize,
    connection_slots: Arc<Semaphore>,
}

impl<S: SnapshotSource> DaemonServer<S> {
    pub fn new(service: TerminalService<S>, config: DaemonConfig, shutdown: Arc<Shutdown>) -> Self {
        let connection_slots = Arc::new(Semaphore::new(config.max_connections));
        Self {
            service,
            config,
            shutdown,
            active_connections: AtomicUsize::new(0),
            connection_slots,
        }
    }

    pub fn service(&self) -> &TerminalService<S> {
        &self.service
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub async fn handle_request(&self, request: RpcRequest) -> RpcResponse {
        let span = handler_span(&request);
        self.dispatch(request).instrument(span).await
    }

    async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        match request.method.as_str() {
            "ping" => handlers::diagnostics::handle_ping(request),
            "health" => handlers::diagnostics::handle_health(
                &self.service,
                &self.active_connections,
                request,
            ),

            "execute" => handlers::session::handle_execute(&self.service, request).await,
            "execute_async" => {
                handlers::session::handle_execute_async(&self.service, request).await
            }
            "read_output" => handlers::session::handle_read_output(&self.service, request).await,
            "has_unread" => handlers::session::handle_has_unread(&self.service, request).await,
            "peek" => handlers::session::handle_peek(&self.service, request).await,
            "read_screen" => handlers::session::handle_read_screen(&self.service, request).await,
            "status" => handlers::session::handle_status(&self.service, request).await,

            "send_control" => handlers::input::handle_send_control(&self.service, request).await,

            "shutdown" => {
                info!("Shutdown requested over RPC");
                self.shutdown.trigger();
                RpcResponse::success(request.id, json!({ "stopping": true }))
            }

            _ => RpcResponse::error(
                request.id,
                error_codes::METHOD_NOT_FOUND,
                &format!("Method not found: {}", request.method),
            ),
        }
    }

    /// Accepts connections until shutdown, then gives in-flight requests a
    /// bounded time to finish.
    pub async fn serve(self: Arc<Self>, listener: UnixListener) {
        loop {
            tokio::select! {
                _ = self.shutdown.wait() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => self.admit(stream),
                    Err(e) => warn!(error = %e, "Error accepting connection"),
                },
            }
        }

        info!(
            active = self.active_connections(),
            "Waiting for active connections to complete"
        );
        let deadline = Instant::now() + DRAIN_TIMEOUT;
        while self.active_connections() > 0 {
            if Instant::now() > deadline {
                warn!("Shutdown timeout, forcing close");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn admit(self: &Arc<Self>, stream: UnixStream) {
        match Arc::clone(&self.connection_slots).try_acquire_owned() {
            Ok(permit) => {
                let server = Arc::clone(self);
                tokio::spawn(async move {
                    server.handle_client(stream).await;
                    drop(permit);
                });
            }
            Err(_) => {
                warn!(
                    max = self.config.max_connections,
                    "Connection limit reached, rejecting client"
                );
                tokio::spawn(async move {
                    let (_, mut writer) = stream.into_split();
                    let response = RpcResponse::error(
                        0,
                        error_codes::DAEMON_ERROR,
                        "Too many connections; retry shortly",
                    );
                    let _ = write_response(&mut writer, &response).await;
                });
            }
        }
    }

    async fn handle_client(&self, stream: UnixStream) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let max_bytes = self.config.max_request_bytes;

        loop {
            let read =
                tokio::time::timeout(self.config.idle_timeout, read_line(&mut reader, max_bytes))
                    .await;

            let line = match read {
                Err(_) => {
                    debug!("Client idle, closing connection");
                    break;
                }
                Ok(Ok(None)) => break,
                Ok(Ok(Some(line))) => line,
                Ok(Err(ReadError::SizeLimit { max_bytes })) => {
                    let response = RpcResponse::error(
                        0,
                        error_codes::PARSE_ERROR,
                        &format!("Parse error: request exceeds {} bytes", max_bytes),
                    );
                    let _ = write_response(&mut writer, &response).await;
                    break;
                }
                Ok(Err(ReadError::Io(e))) => {
                    warn!(error = %e, "Client connection error");
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<RpcRequest>(&line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => RpcResponse::error(
                    0,
                    error_codes::PARSE_ERROR,
                    &format!("Parse error: {}", e),
                ),
            };

            if let Err(e) = write_response(&mut writer, &response).await {
                debug!(error = %e, "Client write failed");
                break;
            }
        }

        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

async fn read_line<R>(reader: &mut R, max_bytes: usize) -> Result<Option<String>, ReadError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = reader
        .take(max_bytes as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await
        .map_err(ReadError::Io)?;

    if n == 0 {
        return Ok(None);
    }
    if buf.len() > max_bytes {
        return Err(ReadError::SizeLimit { max_bytes });
    }

    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

async fn write_response(writer: &mut OwnedWriteHalf, response: &RpcResponse) -> io::Result<()> {
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    tokio::time::timeout(WRITE_TIMEOUT, writer.write_all(&line))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write timed out"))?
}

fn acquire_instance_lock(path: &Path) -> Result<std::fs::File, DaemonError> {
    let mut lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| DaemonError::LockFailed(format!("failed to open lock file: {}", e)))?;

    let result = unsafe { libc::flock(lock_file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result != 0 {
        return Err(DaemonError::AlreadyRunning);
    }

    lock_file
        .set_len(0)
        .map_err(|e| DaemonError::LockFailed(format!("failed to truncate lock file: {}", e)))?;
    writeln!(lock_file, "{}", std::process::id())
        .map_err(|e| DaemonError::LockFailed(format!("failed to write PID to lock file: {}", e)))?;

    Ok(lock_file)
}

/// Runs the daemon in the foreground until SIGINT, SIGTERM or a `shutdown`
/// request.
pub fn start_daemon() -> Result<(), DaemonError> {
    let config = DaemonConfig::from_env();
    let socket_path = socket_path();
    let lock_path = lock_path();

    let _lock_file = acquire_instance_lock(&lock_path)?;

    if socket_path.exists() {
        std::fs::remove_file(&socket_path).map_err(|e| {
            DaemonError::SocketBind(format!("failed to remove stale socket: {}", e))
        })?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("termtap-worker")
        .build()
        .map_err(|e| DaemonError::Runtime(e.to_string()))?;

    let shutdown = Arc::new(Shutdown::new());
    let _signals = SignalHandler::setup(Arc::clone(&shutdown))?;

    let terminal = Arc::new(PtyTerminal::spawn(&config.terminal_config())?);
    let service = TerminalService::new(
        terminal,
        CompletionDetector::new(config.debounce),
        config.lock_timeout,
    );
    let server = Arc::new(DaemonServer::new(service, config, shutdown));

    let result = runtime.block_on(async {
        let listener = UnixListener::bind(&socket_path)
            .map_err(|e| DaemonError::SocketBind(format!("failed to bind socket: {}", e)))?;

        info!(
            socket = %socket_path.display(),
            pid = std::process::id(),
            session_id = server.service().session_id(),
            "termtap daemon started"
        );

        Arc::clone(&server).serve(listener).await;
        Ok(())
    });

    info!("Stopping shell");
    drop(server);
    runtime.shutdown_timeout(Duration::from_secs(1));

    if socket_path.exists() {
        let _ = std::fs::remove_file(&socket_path);
    }
    if lock_path.exists() {
        let _ = std::fs::remove_file(&lock_path);
    }

    info!("Daemon shutdown complete");
    result
}
