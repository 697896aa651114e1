//! Collaborator management for a service.

use super::services::find_service;
use crate::api::auth::{AuthContext, Permission};
use crate::api::router::ServiceIdentity;
use crate::api::state::AppState;
use crate::api::types::*;
use crate::error::ApiError;
use hyper::body::Body;
use hyper::{Request, StatusCode};
use serde_json::{json, Value};
use tracing::info;

async fn read_request<B>(req: Request<B>) -> Result<CollaboratorRequest, ApiError>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let body = collect_body(req).await?;
    let parsed: CollaboratorRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid collaborator JSON: {e}")))?;
    if parsed.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("userId must not be empty".to_string()));
    }
    Ok(parsed)
}

/// GET .../collaborators
pub fn handle_list(
    identity: &ServiceIdentity,
    auth: &AuthContext,
    state: &AppState,
) -> Result<ApiResponse, ApiError> {
    let service = find_service(state, identity)?;
    auth.authorize(&service, Permission::View)?;
    Ok(envelope_response(
        StatusCode::OK,
        "Success",
        Some(json!({
            "owner": service.owner,
            "collaborators": service.collaborators,
        })),
    ))
}

/// POST .../collaborators
pub async fn handle_add<B>(
    req: Request<B>,
    identity: &ServiceIdentity,
    auth: &AuthContext,
    state: &AppState,
) -> Result<ApiResponse, ApiError>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let service = find_service(state, identity)?;
    if auth.authorize(&service, Permission::Manage).is_err() {
        return Err(ApiError::Forbidden(
            "Only the owner can add collaborators".to_string(),
        ));
    }

    let request = read_request(req).await?;
    if service.is_collaborator(&request.user_id) {
        return Err(ApiError::Conflict(
            "User is already a collaborator".to_string(),
        ));
    }
    if service.is_owner(&request.user_id) {
        return Err(ApiError::Conflict(
            "Owner cannot be added as a collaborator".to_string(),
        ));
    }

    state
        .services
        .add_collaborator(service.id, &request.user_id)?
        .ok_or_else(|| ApiError::NotFound("Service not found".to_string()))?;
    info!(
        service = %service.name,
        collaborator = %request.user_id,
        "Collaborator added"
    );
    Ok(envelope_response::<Value>(
        StatusCode::CREATED,
        "Collaborator added successfully",
        None,
    ))
}

/// DELETE .../collaborators
pub async fn handle_remove<B>(
    req: Request<B>,
    identity: &ServiceIdentity,
    auth: &AuthContext,
    state: &AppState,
) -> Result<ApiResponse, ApiError>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let service = find_service(state, identity)?;
    if auth.authorize(&service, Permission::Manage).is_err() {
        return Err(ApiError::Forbidden(
            "Only the owner can remove collaborators".to_string(),
        ));
    }

    let request = read_request(req).await?;
    if !service.is_collaborator(&request.user_id) {
        return Err(ApiError::NotFound("User is not a collaborator".to_string()));
    }

    state
        .services
        .remove_collaborator(service.id, &request.user_id)?
        .ok_or_else(|| ApiError::NotFound("Service not found".to_string()))?;
    info!(
        service = %service.name,
        collaborator = %request.user_id,
        "Collaborator removed"
    );
    Ok(envelope_response::<Value>(
        StatusCode::OK,
        "Collaborator removed successfully",
        None,
    ))
}
