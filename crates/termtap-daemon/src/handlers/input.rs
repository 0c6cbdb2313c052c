use serde_json::json;

use termtap_core::SnapshotSource;
use termtap_ipc::{RpcRequest, RpcResponse};

use super::common::service_error_response;
use crate::service::TerminalService;

pub async fn handle_send_control<S: SnapshotSource>(
    service: &TerminalService<S>,
    request: RpcRequest,
) -> RpcResponse {
    let raw = match request.require_str("signal") {
        Ok(raw) => raw,
        Err(resp) => return resp,
    };

    match service.send_control(raw).await {
        Ok(signal) => RpcResponse::success(
            request.id,
            json!({
                "sent": true,
                "signal": signal.to_string(),
                "code": signal.code()
            }),
        ),
        Err(e) => service_error_response(request.id, &e),
    }
}
