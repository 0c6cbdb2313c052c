use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use serde_json::json;

use termtap_core::SnapshotSource;
use termtap_ipc::{RpcRequest, RpcResponse};

use crate::service::TerminalService;

pub fn handle_ping(request: RpcRequest) -> RpcResponse {
    RpcResponse::success(request.id, json!({ "pong": true }))
}

pub fn handle_health<S: SnapshotSource>(
    service: &TerminalService<S>,
    active_connections: &AtomicUsize,
    request: RpcRequest,
) -> RpcResponse {
    RpcResponse::success(
        request.id,
        json!({
            "status": "healthy",
            "pid": std::process::id(),
            "uptime_ms": service.uptime().as_millis() as u64,
            "session_id": service.session_id(),
            "started_at": service.started_at().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "active_connections": active_connections.load(Ordering::Relaxed)
        }),
    )
}
