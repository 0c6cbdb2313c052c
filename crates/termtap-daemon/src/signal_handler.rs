//! SIGINT/SIGTERM trigger a graceful daemon shutdown.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::info;

use crate::error::DaemonError;
use crate::shutdown::Shutdown;

pub struct SignalHandler {
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl SignalHandler {
    /// Spawns the thread that waits for the first signal. The daemon
    /// normally exits without joining it.
    pub fn setup(shutdown: Arc<Shutdown>) -> Result<Self, DaemonError> {
        let mut signals =
            Signals::new([SIGINT, SIGTERM]).map_err(|e| DaemonError::SignalSetup(e.to_string()))?;

        let handle = thread::Builder::new()
            .name("termtap-signals".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    info!(signal = sig, "Received signal, shutting down");
                    shutdown.trigger();
                }
            })
            .map_err(|e| {
                DaemonError::SignalSetup(format!("failed to spawn signal handler: {}", e))
            })?;

        Ok(Self { handle })
    }
}
