use std::path::PathBuf;

pub const SOCKET_ENV: &str = "TERMTAP_SOCKET";

pub fn socket_path() -> PathBuf {
    if let Ok(custom_path) = std::env::var(SOCKET_ENV) {
        return PathBuf::from(custom_path);
    }

    std::env::var("XDG_RUNTIME_DIR")
        .map(|dir| PathBuf::from(dir).join("termtap.sock"))
        .unwrap_or_else(|_| PathBuf::from("/tmp/termtap.sock"))
}

/// Single-instance lock file that sits next to the socket.
pub fn lock_path() -> PathBuf {
    socket_path().with_extension("lock")
}
