#![deny(clippy::all)]

pub mod error;
mod pty;
mod screen;
mod terminal;

pub use error::PtyError;
pub use pty::PtyHandle;
pub use screen::VirtualTerminal;
pub use screen::DEFAULT_SCROLLBACK;
pub use terminal::PtyTerminal;
pub use terminal::TerminalConfig;
pub use terminal::DEFAULT_SETTLE;

pub type Result<T> = std::result::Result<T, PtyError>;
