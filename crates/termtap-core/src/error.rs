use thiserror::Error;

use crate::source::SourceError;

#[derive(Error, Debug)]
pub enum SessionError {
    /// A command was refused because earlier output was never read. The
    /// refused call consumed that output; it is returned here.
    #[error("Unread output pending; read it or retry with force")]
    UnreadOutput { output: String },
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl SessionError {
    pub fn unread_output(&self) -> Option<&str> {
        match self {
            SessionError::UnreadOutput { output } => Some(output),
            SessionError::Source(_) => None,
        }
    }
}
