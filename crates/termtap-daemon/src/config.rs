use std::env;
use std::time::Duration;

use termtap_core::DEFAULT_DEBOUNCE;
use termtap_terminal::{TerminalConfig, DEFAULT_SCROLLBACK};

use crate::lock_helpers::LOCK_TIMEOUT;

const DEFAULT_SHELL: &str = "/bin/sh";
const DEFAULT_COLS: u16 = 120;
const DEFAULT_ROWS: u16 = 40;
const DEFAULT_MAX_CONNECTIONS: usize = 64;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MAX_REQUEST_BYTES: usize = 1_048_576; // 1MB

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub shell: String,
    pub cols: u16,
    pub rows: u16,
    pub scrollback: usize,
    /// Debounce window of the completion detector; also the quiet period
    /// that ends a command submission.
    pub debounce: Duration,
    pub max_connections: usize,
    pub lock_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_request_bytes: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        Self {
            shell: env::var("TERMTAP_SHELL")
                .or_else(|_| env::var("SHELL"))
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SHELL.to_string()),
            cols: env_parse("TERMTAP_COLS")
                .filter(|c| *c > 0)
                .unwrap_or(DEFAULT_COLS),
            rows: env_parse("TERMTAP_ROWS")
                .filter(|r| *r > 0)
                .unwrap_or(DEFAULT_ROWS),
            scrollback: env_parse("TERMTAP_SCROLLBACK").unwrap_or(DEFAULT_SCROLLBACK),
            debounce: env_parse("TERMTAP_DEBOUNCE_MS")
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_DEBOUNCE),
            max_connections: env_parse("TERMTAP_MAX_CONNECTIONS")
                .filter(|m| *m > 0)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            lock_timeout: env_parse("TERMTAP_LOCK_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(LOCK_TIMEOUT),
            idle_timeout: Duration::from_secs(
                env_parse("TERMTAP_IDLE_TIMEOUT").unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
            ),
            max_request_bytes: env_parse("TERMTAP_MAX_REQUEST")
                .unwrap_or(DEFAULT_MAX_REQUEST_BYTES),
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    pub fn with_scrollback(mut self, lines: usize) -> Self {
        self.scrollback = lines;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_max_request_bytes(mut self, max: usize) -> Self {
        self.max_request_bytes = max;
        self
    }

    pub fn terminal_config(&self) -> TerminalConfig {
        let mut terminal = TerminalConfig::new(self.shell.clone());
        terminal.cols = self.cols;
        terminal.rows = self.rows;
        terminal.scrollback = self.scrollback;
        terminal.settle = self.debounce;
        terminal
    }
}
