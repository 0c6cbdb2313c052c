use serde_json::json;

use termtap_core::SnapshotSource;
use termtap_ipc::{RpcRequest, RpcResponse};

use super::common::service_error_response;
use crate::service::TerminalService;

pub async fn handle_execute<S: SnapshotSource>(
    service: &TerminalService<S>,
    request: RpcRequest,
) -> RpcResponse {
    let command = match request.require_str("command") {
        Ok(command) => command,
        Err(resp) => return resp,
    };
    let force = request.param_bool("force").unwrap_or(false);

    match service.execute(command, force).await {
        Ok(result) => RpcResponse::success(
            request.id,
            json!({
                "output": result.output,
                "buffer": result.buffer
            }),
        ),
        Err(e) => service_error_response(request.id, &e),
    }
}

pub async fn handle_execute_async<S: SnapshotSource>(
    service: &TerminalService<S>,
    request: RpcRequest,
) -> RpcResponse {
    let command = match request.require_str("command") {
        Ok(command) => command,
        Err(resp) => return resp,
    };

    match service.execute_async(command).await {
        Ok(dispatch) => RpcResponse::success(
            request.id,
            json!({
                "dispatched": true,
                "command": dispatch.command
            }),
        ),
        Err(e) => service_error_response(request.id, &e),
    }
}

pub async fn handle_read_output<S: SnapshotSource>(
    service: &TerminalService<S>,
    request: RpcRequest,
) -> RpcResponse {
    match service.read_output().await {
        Ok(read) => RpcResponse::success(
            request.id,
            json!({
                "output": read.output,
                "is_complete": read.is_complete
            }),
        ),
        Err(e) => service_error_response(request.id, &e),
    }
}

pub async fn handle_has_unread<S: SnapshotSource>(
    service: &TerminalService<S>,
    request: RpcRequest,
) -> RpcResponse {
    match service.has_unread().await {
        Ok(has_unread) => RpcResponse::success(request.id, json!({ "has_unread": has_unread })),
        Err(e) => service_error_response(request.id, &e),
    }
}

/// `output` is `null` when nothing is pending, which is not the same as `""`.
pub async fn handle_peek<S: SnapshotSource>(
    service: &TerminalService<S>,
    request: RpcRequest,
) -> RpcResponse {
    match service.peek().await {
        Ok(output) => RpcResponse::success(request.id, json!({ "output": output })),
        Err(e) => service_error_response(request.id, &e),
    }
}

pub async fn handle_read_screen<S: SnapshotSource>(
    service: &TerminalService<S>,
    request: RpcRequest,
) -> RpcResponse {
    let lines = request.param_u64("lines").map(|n| n as usize);

    match service.read_screen(lines).await {
        Ok(screen) => RpcResponse::success(request.id, json!({ "screen": screen })),
        Err(e) => service_error_response(request.id, &e),
    }
}

pub async fn handle_status<S: SnapshotSource>(
    service: &TerminalService<S>,
    request: RpcRequest,
) -> RpcResponse {
    match service.status().await {
        Ok(status) => RpcResponse::success(
            request.id,
            json!({
                "session_id": service.session_id(),
                "awaiting_read": status.awaiting_read,
                "pending_command": status.pending_command,
                "pending_for_ms": status.pending_for_ms,
                "last_read_age_ms": status.last_read_age_ms,
                "last_read_len": status.last_read_len
            }),
        ),
        Err(e) => service_error_response(request.id, &e),
    }
}
