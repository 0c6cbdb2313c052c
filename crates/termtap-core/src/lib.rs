//! Buffered access to a long-lived terminal.
//!
//! Callers see a terminal as a stream of output deltas rather than a screen:
//! [`BufferedSession`] keeps a read cursor over a [`SnapshotSource`] and turns
//! full-buffer snapshots into "what changed since you last looked", using
//! [`extract_new_output`] for the diff and [`CompletionDetector`] to guess when
//! a command has finished.

#![deny(clippy::all)]

pub mod completion;
pub mod control;
pub mod diff;
mod error;
pub mod session;
pub mod sleeper;
pub mod source;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use completion::CompletionDetector;
pub use completion::DEFAULT_DEBOUNCE;
pub use control::ControlSignal;
pub use control::ControlSignalError;
pub use diff::DiffOutcome;
pub use diff::classify;
pub use diff::extract_new_output;
pub use error::SessionError;
pub use session::AsyncDispatch;
pub use session::BufferedSession;
pub use session::ExecuteOptions;
pub use session::ExecuteOutput;
pub use session::PendingCommand;
pub use session::ReadOutput;
pub use session::ReadState;
pub use session::SessionStatus;
pub use sleeper::MockSleeper;
pub use sleeper::Sleeper;
pub use sleeper::TokioSleeper;
pub use source::BoxError;
pub use source::SnapshotSource;
pub use source::SourceError;
