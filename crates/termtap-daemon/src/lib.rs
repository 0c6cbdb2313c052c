#![deny(clippy::all)]

mod config;
mod error;
mod handlers;
mod lock_helpers;
mod server;
mod service;
mod shutdown;
mod signal_handler;

pub use config::DaemonConfig;
pub use error::DaemonError;
pub use error::ServiceError;
pub use lock_helpers::acquire_session_lock;
pub use lock_helpers::LOCK_TIMEOUT;
pub use server::start_daemon;
pub use server::DaemonServer;
pub use service::TerminalService;
pub use shutdown::Shutdown;
pub use signal_handler::SignalHandler;
