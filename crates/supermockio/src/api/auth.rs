//! Caller identity and per-service permissions.
//!
//! Identity is asserted by the fronting gateway through `X-User-Id` and
//! `X-User-Roles` headers.

use crate::error::ApiError;
use crate::store::Service;
use hyper::HeaderMap;

pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USER_ROLES: &str = "x-user-roles";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub roles: Vec<String>,
}

/// What a caller wants to do with a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    Manage,
}

impl AuthContext {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let user_id = headers
            .get(HEADER_USER_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

        let roles = headers
            .get(HEADER_USER_ROLES)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_ascii_lowercase)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            user_id: user_id.to_string(),
            roles,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ROLE_ADMIN)
    }

    /// Owners may do anything, collaborators may only view.
    pub fn authorize(&self, service: &Service, permission: Permission) -> Result<(), ApiError> {
        if self.is_admin() || service.is_owner(&self.user_id) {
            return Ok(());
        }
        if permission == Permission::View && service.is_collaborator(&self.user_id) {
            return Ok(());
        }
        Err(ApiError::Forbidden(
            "You don't have permission to access this service".to_string(),
        ))
    }
}
