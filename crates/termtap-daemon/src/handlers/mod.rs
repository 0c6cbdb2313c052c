pub mod common;
pub mod diagnostics;
pub mod input;
pub mod session;
