//! Route dispatch logic for the HTTP API.

use crate::api::auth::AuthContext;
use crate::api::handlers::{collaborators, mocks, services, system};
use crate::api::state::AppState;
use crate::api::types::{api_error_response, not_found, ApiResponse};
use crate::error::ApiError;
use hyper::body::Body;
use hyper::{Method, Request};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// `{owner}/{name}/{version}` as found in a request path, percent-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub owner: String,
    pub name: String,
    pub version: String,
}

impl ServiceIdentity {
    fn from_segments(owner: &str, name: &str, version: &str) -> Self {
        Self {
            owner: decode_segment(owner),
            name: decode_segment(name),
            version: decode_segment(version),
        }
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Parsed route
#[derive(Debug, PartialEq, Eq)]
enum Route {
    /// GET /health
    Health,
    /// GET/POST /api/services
    Services,
    /// GET/DELETE /api/services/:owner/:name/:version
    Service(ServiceIdentity),
    /// GET /api/services/spec/:owner/:name/:version
    ServiceSpec(ServiceIdentity),
    /// GET/POST/DELETE /api/services/:owner/:name/:version/collaborators
    Collaborators(ServiceIdentity),
    /// ANY /mocks/:owner/:name/:version/*path
    Mock(ServiceIdentity),
}

impl Route {
    fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        match segments.as_slice() {
            ["health"] => Some(Route::Health),
            ["api", "services"] | ["api", "services", ""] => Some(Route::Services),
            ["api", "services", owner, name, version, "collaborators"] => Some(
                Route::Collaborators(ServiceIdentity::from_segments(owner, name, version)),
            ),
            ["api", "services", "spec", owner, name, version] => Some(Route::ServiceSpec(
                ServiceIdentity::from_segments(owner, name, version),
            )),
            ["api", "services", owner, name, version] => Some(Route::Service(
                ServiceIdentity::from_segments(owner, name, version),
            )),
            ["mocks", owner, name, version, ..] => Some(Route::Mock(
                ServiceIdentity::from_segments(owner, name, version),
            )),
            _ => None,
        }
    }

    fn is_admin(&self) -> bool {
        !matches!(self, Route::Health | Route::Mock(_))
    }
}

/// Main request router
pub async fn route_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<ApiResponse, hyper::Error>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());

    debug!("{} {}", method, path);

    let response = match route_by_path(&method, &path, query.as_deref(), req, &state).await {
        Ok(response) => response,
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                error!("{} {} failed with status {}: {}", method, path, status.as_u16(), e);
            } else {
                warn!("{} {} failed with status {}: {}", method, path, status.as_u16(), e);
            }
            api_error_response(&e, &path)
        }
    };
    Ok(response)
}

async fn route_by_path<B>(
    method: &Method,
    path: &str,
    query: Option<&str>,
    req: Request<B>,
    state: &AppState,
) -> Result<ApiResponse, ApiError>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let Some(route) = Route::parse(path) else {
        return Ok(not_found(path));
    };

    let auth = if route.is_admin() {
        Some(AuthContext::from_headers(req.headers())?)
    } else {
        None
    };
    let auth = auth.as_ref();

    match (method, route, auth) {
        (&Method::GET, Route::Health, _) => Ok(system::handle_health()),

        (_, Route::Mock(identity), _) => {
            mocks::handle_mock(&identity, method, path, req.headers(), state)
        }

        (&Method::GET, Route::Services, Some(auth)) => services::handle_list(auth, state),
        (&Method::POST, Route::Services, Some(auth)) => {
            services::handle_create(req, query, auth, state).await
        }

        (&Method::GET, Route::Service(identity), Some(auth)) => {
            services::handle_get(&identity, auth, state)
        }
        (&Method::DELETE, Route::Service(identity), Some(auth)) => {
            services::handle_delete(&identity, auth, state)
        }
        (&Method::GET, Route::ServiceSpec(identity), Some(auth)) => {
            services::handle_spec(&identity, auth, state)
        }

        (&Method::GET, Route::Collaborators(identity), Some(auth)) => {
            collaborators::handle_list(&identity, auth, state)
        }
        (&Method::POST, Route::Collaborators(identity), Some(auth)) => {
            collaborators::handle_add(req, &identity, auth, state).await
        }
        (&Method::DELETE, Route::Collaborators(identity), Some(auth)) => {
            collaborators::handle_remove(req, &identity, auth, state).await
        }

        _ => Ok(not_found(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(owner: &str, name: &str, version: &str) -> ServiceIdentity {
        ServiceIdentity {
            owner: owner.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    #[test]
    fn test_route_parse() {
        assert_eq!(Route::parse("/health"), Some(Route::Health));
        assert_eq!(Route::parse("/api/services"), Some(Route::Services));
        assert_eq!(
            Route::parse("/api/services/alice/Swagger%20Petstore/1.0.0"),
            Some(Route::Service(identity("alice", "Swagger Petstore", "1.0.0")))
        );
        assert_eq!(
            Route::parse("/api/services/spec/alice/Petstore/1"),
            Some(Route::ServiceSpec(identity("alice", "Petstore", "1")))
        );
        assert_eq!(
            Route::parse("/api/services/alice/Petstore/1/collaborators"),
            Some(Route::Collaborators(identity("alice", "Petstore", "1")))
        );
        assert_eq!(
            Route::parse("/mocks/alice/Petstore/1/pets/7"),
            Some(Route::Mock(identity("alice", "Petstore", "1")))
        );
        assert_eq!(
            Route::parse("/mocks/alice/Petstore/1"),
            Some(Route::Mock(identity("alice", "Petstore", "1")))
        );

        // Invalid routes
        assert!(Route::parse("/").is_none());
        assert!(Route::parse("/api/services/alice").is_none());
        assert!(Route::parse("/mocks/alice/Petstore").is_none());
    }

    #[test]
    fn test_admin_routes_need_identity() {
        assert!(Route::Services.is_admin());
        assert!(!Route::Health.is_admin());
        assert!(!Route::Mock(identity("a", "b", "c")).is_admin());
    }
}
