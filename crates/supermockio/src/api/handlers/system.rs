//! System handlers.

use crate::api::types::*;
use hyper::StatusCode;

/// GET /health - Health check
pub fn handle_health() -> ApiResponse {
    json_response(
        StatusCode::OK,
        &serde_json::json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}),
    )
}
