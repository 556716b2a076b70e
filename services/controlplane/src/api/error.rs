//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction to keep error shapes uniform
//! across governance endpoints, and maps the governance error taxonomy onto
//! status codes.
//!
//! # Key invariants and assumptions
//! - Error responses must include a stable `code` and human-readable `message`.
//! - Status codes must align with the error category:
//!   not found 404, unauthorized 403, invalid state transition 409,
//!   validation 400, conflict 409, store unavailable 503.
//!
//! # Security considerations
//! - Store failures log details server-side but return generic messages.
use crate::api::types::ErrorResponse;
use crate::governance::GovernanceError;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use gatehouse_controlplane::api::error::ApiError;
/// use gatehouse_controlplane::api::types::ErrorResponse;
///
/// let err = ApiError {
///     status: StatusCode::NOT_FOUND,
///     body: ErrorResponse {
///         code: "not_found".to_string(),
///         message: "missing".to_string(),
///         request_id: None,
///     },
/// };
/// assert_eq!(err.status, StatusCode::NOT_FOUND);
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

/// Build a 404 Not Found error.
pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 409 Conflict error with a caller-provided code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, code, message)
}

/// Build a 500 Internal Server Error from a store error.
///
/// # What it does
/// Logs the store error and returns a generic internal error response.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    // Log internal details server-side; return generic message.
    tracing::error!(error = ?err, "gatehouse storage error");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 401 Unauthorized error (caller could not be identified).
pub fn api_unauthorized(message: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// Build a 403 Forbidden error (caller lacks the required capability).
pub fn api_forbidden(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, "forbidden", message)
}

/// Build a 400 Bad Request validation error.
pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Build a 503 Service Unavailable error.
pub fn api_unavailable(message: &str) -> ApiError {
    api_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", message)
}

impl From<GovernanceError> for ApiError {
    fn from(err: GovernanceError) -> Self {
        let message = err.to_string();
        match err {
            GovernanceError::NotFound(_) => api_not_found(&message),
            GovernanceError::Unauthorized(_) => api_forbidden(&message),
            GovernanceError::InvalidStateTransition { .. } => {
                api_conflict("invalid_state_transition", &message)
            }
            GovernanceError::ValidationError(_) => api_validation_error(&message),
            GovernanceError::Conflict(_) => api_conflict("conflict", &message),
            GovernanceError::StoreUnavailable(_) => {
                tracing::error!(error = %message, "governance store unavailable");
                api_unavailable("permission store unavailable")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RequestStatus;

    #[test]
    fn api_error_helpers_build_expected_codes() {
        let not_found = api_not_found("missing");
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.body.code, "not_found");

        let conflict = api_conflict("already_exists", "conflict");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.body.code, "already_exists");

        let unauthorized = api_unauthorized("nope");
        assert_eq!(unauthorized.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unauthorized.body.code, "unauthorized");

        let forbidden = api_forbidden("nope");
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
        assert_eq!(forbidden.body.code, "forbidden");

        let validation = api_validation_error("bad");
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);
        assert_eq!(validation.body.code, "validation_error");

        let unavailable = api_unavailable("down");
        assert_eq!(unavailable.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(unavailable.body.code, "store_unavailable");
    }

    #[test]
    fn api_internal_logs_and_wraps_store_error() {
        let err = StoreError::Unexpected(anyhow::anyhow!("boom"));
        let api = api_internal("storage failed", &err);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.body.code, "internal");
        assert_eq!(api.body.message, "storage failed");
    }

    #[test]
    fn governance_errors_map_to_statuses() {
        let cases = [
            (GovernanceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (GovernanceError::Unauthorized("x".into()), StatusCode::FORBIDDEN),
            (
                GovernanceError::InvalidStateTransition {
                    id: 1,
                    status: RequestStatus::Approved,
                },
                StatusCode::CONFLICT,
            ),
            (
                GovernanceError::ValidationError("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (GovernanceError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                GovernanceError::StoreUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn store_unavailable_hides_details() {
        let api = ApiError::from(GovernanceError::StoreUnavailable("db at 10.0.0.3".into()));
        assert_eq!(api.body.message, "permission store unavailable");
    }
}
