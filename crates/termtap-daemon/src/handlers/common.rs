use tracing::{debug_span, Span};

use termtap_ipc::{ErrorData, RpcRequest, RpcResponse};

use crate::error::ServiceError;

pub fn handler_span(request: &RpcRequest) -> Span {
    debug_span!(
        "rpc_handler",
        method = %request.method,
        request_id = request.id
    )
}

pub fn service_error_response(id: u64, err: &ServiceError) -> RpcResponse {
    RpcResponse::error_with_data(
        id,
        err.code(),
        &err.to_string(),
        ErrorData {
            category: err.category().as_str().to_string(),
            retryable: err.is_retryable(),
            context: err.context(),
            suggestion: err.suggestion(),
        },
    )
}
