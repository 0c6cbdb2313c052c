//! Control signals: the bytes a user produces with Ctrl+<letter> and friends.

use std::fmt;

use thiserror::Error;

const ESCAPE: u8 = 27;
const TELNET_ESCAPE: u8 = 29;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlSignalError {
    #[error("Invalid control signal '{0}': expected a letter A-Z, ']' or ESC")]
    Invalid(String),
}

/// A validated control code ready to be written to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSignal {
    code: u8,
}

impl ControlSignal {
    /// Parses a symbolic signal, case-insensitively.
    ///
    /// `C` is Ctrl+C (3), `]` is the telnet escape (29), `ESC`/`ESCAPE` is 27.
    pub fn parse(raw: &str) -> Result<Self, ControlSignalError> {
        let name = raw.trim().to_ascii_uppercase();

        let code = match name.as_str() {
            "ESC" | "ESCAPE" => ESCAPE,
            "]" => TELNET_ESCAPE,
            _ => match name.as_bytes() {
                [letter @ b'A'..=b'Z'] => letter - b'A' + 1,
                _ => return Err(ControlSignalError::Invalid(raw.to_string())),
            },
        };

        Ok(Self { code })
    }

    pub fn code(self) -> u8 {
        self.code
    }

    pub fn as_bytes(&self) -> [u8; 1] {
        [self.code]
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            ESCAPE => write!(f, "ESC"),
            TELNET_ESCAPE => write!(f, "Ctrl+]"),
            code => write!(f, "Ctrl+{}", (b'A' + code - 1) as char),
        }
    }
}
