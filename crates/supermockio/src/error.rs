//! Error types shared across the example pipeline and the HTTP surface.

use hyper::StatusCode;

/// Failures while walking a schema tree.
///
/// These never leave the walker: the value being generated degrades to an
/// empty object instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to resolve reference: {0}")]
    Reference(String),
    #[error("Unsupported schema type: {0}")]
    Unsupported(String),
}

/// Failures of the generative collaborator.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI generation is disabled")]
    Disabled,
    #[error("AI service is not configured: {0}")]
    NotConfigured(String),
    #[error("AI request failed: {0}")]
    Request(String),
    #[error("AI service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("AI service returned an empty reply")]
    EmptyReply,
    #[error("AI reply is not valid JSON: {0}")]
    Parse(String),
    #[error("AI request timed out after {0}s")]
    Timeout(u64),
}

/// The only error a mock caller ever sees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("{0}")]
    NotFound(String),
    #[error("Storage failure: {0}")]
    Store(String),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Store conditions callers act on; anything else stays an opaque `anyhow` error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Service {name}@{version} already exists")]
    DuplicateService { name: String, version: String },
}

/// Errors returned by the admin API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<StoreError>() {
            Some(StoreError::DuplicateService { .. }) => {
                ApiError::Conflict("Service already exists".to_string())
            }
            None => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::NotFound(msg) => ApiError::NotFound(msg),
            DispatchError::Store(msg) => ApiError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_service_maps_to_conflict() {
        let err: ApiError = anyhow::Error::new(StoreError::DuplicateService {
            name: "Petstore".to_string(),
            version: "1.0".to_string(),
        })
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err: ApiError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_reference_error_message() {
        let err = SchemaError::Reference("#/components/schemas/Missing".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to resolve reference: #/components/schemas/Missing"
        );
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        let from_dispatch: ApiError = DispatchError::NotFound("gone".into()).into();
        assert_eq!(from_dispatch.status_code(), StatusCode::NOT_FOUND);
    }
}
