use std::io::Read;
use std::io::Write;

use portable_pty::native_pty_system;
use portable_pty::Child;
use portable_pty::CommandBuilder;
use portable_pty::MasterPty;
use portable_pty::PtySize;

use crate::error::PtyError;
use crate::terminal::TerminalConfig;

/// The shell side of a [`crate::PtyTerminal`]: child process plus master
/// write end.
///
/// Output is not read here. [`PtyHandle::take_reader`] hands the master's
/// read side to the one thread that pumps it. Dropping the handle kills a
/// shell that is still running.
pub struct PtyHandle {
    // Owned so the PTY stays open for as long as the shell does.
    _master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    reader: Option<Box<dyn Read + Send>>,
    writer: Box<dyn Write + Send>,
}

impl PtyHandle {
    pub fn spawn(config: &TerminalConfig) -> Result<Self, PtyError> {
        let pair = native_pty_system()
            .openpty(PtySize {
                rows: config.rows,
                cols: config.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let child = pair
            .slave
            .spawn_command(shell_command(config))
            .map_err(|e| PtyError::Spawn(e.to_string()))?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::Open(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::Open(e.to_string()))?;

        Ok(Self {
            _master: pair.master,
            child,
            reader: Some(reader),
            writer,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// `false` once the shell has exited or can no longer be polled.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// The master's read side. Available once.
    pub fn take_reader(&mut self) -> Result<Box<dyn Read + Send>, PtyError> {
        self.reader
            .take()
            .ok_or_else(|| PtyError::Read("reader already taken".to_string()))
    }

    /// Writes all of `data` and flushes it to the shell.
    pub fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.writer
            .write_all(data)
            .and_then(|()| self.writer.flush())
            .map_err(|e| PtyError::Write(e.to_string()))
    }
}

impl Drop for PtyHandle {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.child.kill() {
                tracing::debug!(error = %e, "Failed to kill shell on drop");
            }
        }
    }
}

fn shell_command(config: &TerminalConfig) -> CommandBuilder {
    let mut cmd = CommandBuilder::new(&config.shell);
    cmd.args(&config.args);
    if let Some(dir) = &config.cwd {
        cmd.cwd(dir);
    }
    for (key, value) in &config.env {
        cmd.env(key, value);
    }
    cmd.env("TERM", "xterm-256color");
    cmd
}
