//! Mock traffic: `ANY /mocks/{owner}/{name}/{version}/*path`.

use crate::api::router::ServiceIdentity;
use crate::api::state::AppState;
use crate::api::types::*;
use crate::dispatch::MockRequest;
use crate::error::ApiError;
use hyper::{HeaderMap, Method, StatusCode};
use tracing::debug;

/// Selects the stored status code.
pub const HEADER_STATUS: &str = "x-supermockio-status";
/// Selects the stored example by name.
pub const HEADER_EXAMPLE: &str = "x-supermockio-example";

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build the dispatch request from the inbound call.
pub fn mock_request(
    identity: &ServiceIdentity,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
) -> Result<MockRequest, ApiError> {
    let status = header_str(headers, HEADER_STATUS)
        .map(|raw| {
            raw.parse::<u16>().map_err(|_| {
                ApiError::BadRequest(format!("Invalid X-SuperMockio-Status header '{raw}'"))
            })
        })
        .transpose()?;

    Ok(MockRequest {
        owner: identity.owner.clone(),
        name: identity.name.clone(),
        version: identity.version.clone(),
        method: method.as_str().to_ascii_lowercase(),
        path: path.to_string(),
        status,
        example: header_str(headers, HEADER_EXAMPLE).map(String::from),
    })
}

pub fn handle_mock(
    identity: &ServiceIdentity,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    state: &AppState,
) -> Result<ApiResponse, ApiError> {
    let request = mock_request(identity, method, path, headers)?;
    let reply = state.dispatcher.dispatch(&request)?;
    debug!(
        method = %request.method,
        path = %request.path,
        status = reply.status_code,
        example = reply.example_name.as_deref().unwrap_or("-"),
        "Serving mock response"
    );

    let status = StatusCode::from_u16(reply.status_code).map_err(|_| {
        ApiError::Internal(format!("Stored status code {} is invalid", reply.status_code))
    })?;
    Ok(json_response(status, &reply.content))
}
