//! Answers mock traffic from stored responses.

use crate::config::StrictMode;
use crate::error::DispatchError;
use crate::store::{ResponseQuery, ResponseStore, ServiceStore};
use rand::seq::SliceRandom;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Segments before the operation path: "", "mocks", owner, name, version.
const PREFIX_SEGMENTS: usize = 5;

pub const SERVICE_NOT_FOUND: &str = "The service cannot be found";
pub const NO_RESPONSE_DEFINED: &str = "No response defined for this endpoint";

/// An inbound mock call.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    pub owner: String,
    pub name: String,
    pub version: String,
    pub method: String,
    /// Full request path, including the `/mocks/{owner}/{name}/{version}` prefix.
    pub path: String,
    /// `X-SuperMockio-Status`
    pub status: Option<u16>,
    /// `X-SuperMockio-Example`
    pub example: Option<String>,
}

/// The stored response to replay.
#[derive(Debug, Clone, PartialEq)]
pub struct MockReply {
    pub status_code: u16,
    pub content: Value,
    pub example_name: Option<String>,
}

/// Strip the mock prefix from a request path.
///
/// The result always starts with `/` and is percent-decoded.
pub fn normalize_path(full_path: &str) -> String {
    let path = full_path.split(['?', '#']).next().unwrap_or_default();
    let rest = path
        .split('/')
        .skip(PREFIX_SEGMENTS)
        .collect::<Vec<_>>()
        .join("/");
    let decoded = match urlencoding::decode(&rest) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => rest.clone(),
    };
    format!("/{}", decoded.trim_start_matches('/'))
}

pub struct MockDispatcher {
    services: Arc<dyn ServiceStore>,
    responses: Arc<dyn ResponseStore>,
    strict: StrictMode,
}

impl MockDispatcher {
    pub fn new(
        services: Arc<dyn ServiceStore>,
        responses: Arc<dyn ResponseStore>,
        strict: StrictMode,
    ) -> Self {
        Self {
            services,
            responses,
            strict,
        }
    }

    pub fn dispatch(&self, request: &MockRequest) -> Result<MockReply, DispatchError> {
        let path = normalize_path(&request.path);
        let method = request.method.to_ascii_lowercase();

        let service = self
            .services
            .find_service_by_identity(Some(&request.owner), &request.name, &request.version)
            .map_err(|e| DispatchError::Store(e.to_string()))?
            .ok_or_else(|| DispatchError::NotFound(SERVICE_NOT_FOUND.to_string()))?;

        let query = ResponseQuery {
            service_id: service.id,
            path: path.clone(),
            method: method.clone(),
            status_code: request.status,
            example_name: request.example.clone(),
        };
        let found = self
            .responses
            .find_one(&query)
            .map_err(|e| DispatchError::Store(e.to_string()))?;

        if let Some(record) = found {
            debug!(
                path = %path,
                method = %method,
                status = record.status_code,
                "Mock response matched"
            );
            return Ok(MockReply {
                status_code: record.status_code,
                content: record.content,
                example_name: record.example_name,
            });
        }

        if self.strict.is_enabled() {
            return Err(DispatchError::NotFound(format!(
                "The request endpoint is not defined in this service with the following criteria: statusCode = {}, exampleName = {}.",
                request
                    .status
                    .map_or_else(|| "N/A".to_string(), |s| s.to_string()),
                request.example.as_deref().unwrap_or("N/A"),
            )));
        }

        let candidates = self
            .responses
            .find_by_endpoint(service.id, &path, &method)
            .map_err(|e| DispatchError::Store(e.to_string()))?;
        let record = candidates
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| DispatchError::NotFound(NO_RESPONSE_DEFINED.to_string()))?;

        debug!(
            path = %path,
            method = %method,
            status = record.status_code,
            "No exact match, serving a random response for the endpoint"
        );
        Ok(MockReply {
            status_code: record.status_code,
            content: record.content.clone(),
            example_name: record.example_name.clone(),
        })
    }
}
