#![deny(clippy::all)]

mod client;
mod error;
mod socket;
mod types;

pub use termtap_common::error_codes;

pub use client::ensure_daemon;
pub use client::start_daemon_background;
pub use client::DaemonClient;
pub use client::DEFAULT_READ_TIMEOUT;
pub use error::ClientError;
pub use socket::lock_path;
pub use socket::socket_path;
pub use socket::SOCKET_ENV;
pub use types::ErrorData;
pub use types::RpcRequest;
pub use types::RpcResponse;

pub type Result<T> = std::result::Result<T, ClientError>;
