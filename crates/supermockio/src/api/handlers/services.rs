//! Service upload, listing, inspection and removal.

use crate::api::auth::{AuthContext, Permission};
use crate::api::router::ServiceIdentity;
use crate::api::state::AppState;
use crate::api::types::*;
use crate::dispatch::SERVICE_NOT_FOUND;
use crate::error::ApiError;
use crate::store::Service;
use hyper::body::Body;
use hyper::{Request, StatusCode};
use serde_json::{json, Map, Number, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Parse an uploaded OpenAPI document, YAML or JSON.
///
/// Non-string mapping keys (YAML reads `200:` as an integer) become strings.
pub fn parse_document(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::BadRequest(
            "No OpenAPI document provided".to_string(),
        ));
    }
    let mut yaml: serde_yaml::Value = serde_yaml::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid OpenAPI document: {e}")))?;
    yaml.apply_merge()
        .map_err(|e| ApiError::BadRequest(format!("Invalid OpenAPI document: {e}")))?;
    yaml_to_json(yaml)
}

fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, ApiError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    Yaml::Null => "null".to_string(),
                    other => {
                        return Err(ApiError::BadRequest(format!(
                            "Unsupported mapping key in OpenAPI document: {other:?}"
                        )))
                    }
                };
                object.insert(key, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

pub(crate) fn find_service(
    state: &AppState,
    identity: &ServiceIdentity,
) -> Result<Arc<Service>, ApiError> {
    state
        .services
        .find_service_by_identity(Some(&identity.owner), &identity.name, &identity.version)?
        .ok_or_else(|| ApiError::NotFound(SERVICE_NOT_FOUND.to_string()))
}

/// GET /api/services
pub fn handle_list(auth: &AuthContext, state: &AppState) -> Result<ApiResponse, ApiError> {
    let services = state.services.list_services_for_user(&auth.user_id)?;
    let services: Vec<&Service> = services.iter().map(Arc::as_ref).collect();
    Ok(envelope_response(StatusCode::OK, "Success", Some(services)))
}

/// POST /api/services?override=1
pub async fn handle_create<B>(
    req: Request<B>,
    query: Option<&str>,
    auth: &AuthContext,
    state: &AppState,
) -> Result<ApiResponse, ApiError>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let body = collect_body(req).await?;
    let openapi = parse_document(&body)?;
    let service = Service::from_document(openapi, auth.user_id.clone()).ok_or_else(|| {
        ApiError::BadRequest(
            "Invalid OpenAPI document: info.title and info.version are required".to_string(),
        )
    })?;

    if let Some(existing) =
        state
            .services
            .find_service_by_identity(None, &service.name, &service.version)?
    {
        if !query_flag(query, "override") {
            return Err(ApiError::Conflict("Service already exists".to_string()));
        }
        if !existing.is_owner(&auth.user_id) && !auth.is_admin() {
            return Err(ApiError::Forbidden(
                "Only the owner can override a service".to_string(),
            ));
        }
        let removed = state.responses.delete_by_service(existing.id)?;
        state.services.delete_service(existing.id)?;
        info!(
            service = %existing.name,
            version = %existing.version,
            responses = removed,
            "Overriding existing service"
        );
    }

    // Duplicates that slip past the lookup are rejected by the store
    let created = state.services.insert_service(service)?;
    let report = state.ingestor.ingest(&created).await;
    if report.fallbacks > 0 {
        warn!(
            service = %created.name,
            fallbacks = report.fallbacks,
            "Some responses could not be generated from the document"
        );
    }

    Ok(envelope_response(
        StatusCode::CREATED,
        "Service added successfully",
        Some(json!({
            "message": "Service added successfully",
            "service": {
                "name": created.name,
                "version": created.version,
                "owner": created.owner,
            },
            "responses": report,
        })),
    ))
}

/// GET /api/services/{owner}/{name}/{version}
pub fn handle_get(
    identity: &ServiceIdentity,
    auth: &AuthContext,
    state: &AppState,
) -> Result<ApiResponse, ApiError> {
    let service = find_service(state, identity)?;
    auth.authorize(&service, Permission::View)?;
    let responses = state.responses.find_by_service(service.id)?;
    Ok(envelope_response(
        StatusCode::OK,
        "Success",
        Some(json!({"service": &*service, "responses": responses})),
    ))
}

/// GET /api/services/spec/{owner}/{name}/{version}
pub fn handle_spec(
    identity: &ServiceIdentity,
    auth: &AuthContext,
    state: &AppState,
) -> Result<ApiResponse, ApiError> {
    let service = find_service(state, identity)?;
    auth.authorize(&service, Permission::View)?;
    Ok(json_response(
        StatusCode::OK,
        &json!({"openapi": service.openapi}),
    ))
}

/// DELETE /api/services/{owner}/{name}/{version}
pub fn handle_delete(
    identity: &ServiceIdentity,
    auth: &AuthContext,
    state: &AppState,
) -> Result<ApiResponse, ApiError> {
    let service = find_service(state, identity)?;
    auth.authorize(&service, Permission::Manage)?;
    let removed = state.responses.delete_by_service(service.id)?;
    state.services.delete_service(service.id)?;
    info!(
        service = %service.name,
        version = %service.version,
        responses = removed,
        "Deleted service"
    );
    Ok(envelope_response::<Value>(
        StatusCode::OK,
        "Responses Deleted successfully",
        None,
    ))
}
