use std::collections::HashMap;
use std::io;
use std::io::Read;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use termtap_common::mutex_lock_or_recover;
use termtap_core::{ControlSignal, SnapshotSource, SourceError};

use crate::error::PtyError;
use crate::pty::PtyHandle;
use crate::screen::{VirtualTerminal, DEFAULT_SCROLLBACK};

pub const DEFAULT_SETTLE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct TerminalConfig {
    pub shell: String,
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub env: HashMap<String, String>,
    pub cols: u16,
    pub rows: u16,
    pub scrollback: usize,
    /// Quiet period that ends a submission once output has started.
    pub settle: Duration,
}

impl TerminalConfig {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            cols: 120,
            rows: 40,
            scrollback: DEFAULT_SCROLLBACK,
            settle: DEFAULT_SETTLE,
        }
    }
}

/// A shell in a PTY, seen as one growing text buffer.
///
/// A named reader thread feeds PTY output into the virtual screen and bumps
/// a generation counter on every chunk. The counter is the synchronization
/// signal `submit` waits on; the sender drops when the shell's output ends,
/// which turns pending and later waits into [`SourceError::Closed`].
pub struct PtyTerminal {
    pty: Mutex<PtyHandle>,
    screen: Arc<VirtualTerminal>,
    generation: watch::Receiver<u64>,
    settle: Duration,
}

impl PtyTerminal {
    pub fn spawn(config: &TerminalConfig) -> Result<Self, PtyError> {
        let mut pty = PtyHandle::spawn(config)?;
        let reader = pty.take_reader()?;

        let screen = Arc::new(VirtualTerminal::with_scrollback(
            config.cols,
            config.rows,
            config.scrollback,
        ));
        let (tx, rx) = watch::channel(0u64);

        let pump_screen = Arc::clone(&screen);
        thread::Builder::new()
            .name("termtap-pty-reader".to_string())
            .spawn(move || pump_output(reader, &pump_screen, &tx))
            .map_err(|e| PtyError::Open(format!("reader thread: {e}")))?;

        info!(
            shell = %config.shell,
            pid = ?pty.pid(),
            cols = config.cols,
            rows = config.rows,
            "Shell started"
        );

        Ok(Self {
            pty: Mutex::new(pty),
            screen,
            generation: rx,
            settle: config.settle,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        mutex_lock_or_recover(&self.pty).pid()
    }

    pub fn is_running(&self) -> bool {
        mutex_lock_or_recover(&self.pty).is_running()
    }

    fn write(&self, data: &[u8]) -> Result<(), PtyError> {
        mutex_lock_or_recover(&self.pty).write(data)
    }

    fn write_line(&self, command: &str) -> Result<(), SourceError> {
        let line = format!("{command}\r");
        self.write(line.as_bytes()).map_err(|e| {
            warn!(error = %e, "Failed to submit command");
            SourceError::Submission(Box::new(e))
        })
    }

    /// Waits for the first output after a write, then until output pauses
    /// for one settle period.
    async fn await_reaction(&self, mut rx: watch::Receiver<u64>) -> Result<(), SourceError> {
        rx.changed().await.map_err(|_| SourceError::Closed)?;

        loop {
            match tokio::time::timeout(self.settle, rx.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) => return Ok(()),
                Err(_) => return Ok(()),
            }
        }
    }
}

fn pump_output(
    mut reader: Box<dyn Read + Send>,
    screen: &VirtualTerminal,
    tx: &watch::Sender<u64>,
) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                screen.process(&buf[..n]);
                tx.send_modify(|generation| *generation += 1);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                // EIO is how Linux reports the slave side closing.
                debug!(error = %e, "PTY read ended");
                break;
            }
        }
    }
    info!("Shell output closed");
}

#[async_trait]
impl SnapshotSource for PtyTerminal {
    async fn snapshot(&self) -> Result<String, SourceError> {
        Ok(self.screen.buffer_text())
    }

    async fn submit(&self, command: &str) -> Result<(), SourceError> {
        let mut rx = self.generation.clone();
        rx.borrow_and_update();

        self.write_line(command)?;
        self.await_reaction(rx).await
    }

    async fn dispatch(&self, command: &str) -> Result<(), SourceError> {
        self.write_line(command)
    }

    async fn send_control(&self, signal: ControlSignal) -> Result<(), SourceError> {
        self.write(&signal.as_bytes())
            .map_err(|e| SourceError::Submission(Box::new(e)))
    }
}
