//! Response envelopes and helpers for the HTTP API.

use crate::error::ApiError;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type ApiResponse = Response<Full<Bytes>>;

/// Envelope of every admin response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            data,
            timestamp: now_iso(),
            path: None,
        }
    }
}

/// Body of `POST .../collaborators` and `DELETE .../collaborators`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorRequest {
    pub user_id: String,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> ApiResponse {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

/// Wrap `data` in the envelope.
pub fn envelope_response<T: Serialize>(
    status: StatusCode,
    message: &str,
    data: Option<T>,
) -> ApiResponse {
    json_response(status, &Envelope::new(status, message, data))
}

/// Build an HTTP response with headers.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> ApiResponse {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

/// Error envelope: `{status, message, timestamp, path}`.
pub fn error_response(status: StatusCode, message: &str, path: &str) -> ApiResponse {
    let mut envelope = Envelope::<Value>::new(status, message, None);
    envelope.path = Some(path.to_string());
    json_response(status, &envelope)
}

pub fn api_error_response(error: &ApiError, path: &str) -> ApiResponse {
    error_response(error.status_code(), &error.to_string(), path)
}

pub fn not_found(path: &str) -> ApiResponse {
    error_response(StatusCode::NOT_FOUND, "Not Found", path)
}

/// Collect request body into bytes
pub async fn collect_body<B>(req: Request<B>) -> Result<Bytes, ApiError>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    req.into_body()
        .collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {e}")))
}

/// True when a query flag such as `override=1` is set.
pub fn query_flag(query: Option<&str>, name: &str) -> bool {
    query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .any(|(key, value)| key == name && !matches!(value, "0" | "false" | ""))
}
