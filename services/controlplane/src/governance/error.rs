use crate::model::{RequestId, RequestStatus};
use crate::store::StoreError;
use gatehouse_authz::AuthzError;
use thiserror::Error;

/// Errors surfaced by mutating governance operations.
///
/// Access decisions never return these; they deny with a `DenialReason` instead.
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("change request {id} is {status}, not pending")]
    InvalidStateTransition { id: RequestId, status: RequestStatus },
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type GovernanceResult<T> = Result<T, GovernanceError>;

impl From<StoreError> for GovernanceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => GovernanceError::NotFound(what),
            StoreError::Conflict(message) => GovernanceError::Conflict(message),
            err @ StoreError::VersionMismatch { .. } => GovernanceError::Conflict(err.to_string()),
            StoreError::Unavailable(message) => GovernanceError::StoreUnavailable(message),
            StoreError::Unexpected(err) => GovernanceError::StoreUnavailable(err.to_string()),
        }
    }
}

impl From<AuthzError> for GovernanceError {
    fn from(err: AuthzError) -> Self {
        GovernanceError::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_taxonomy() {
        assert!(matches!(
            GovernanceError::from(StoreError::NotFound("profile staff".into())),
            GovernanceError::NotFound(_)
        ));
        assert!(matches!(
            GovernanceError::from(StoreError::VersionMismatch {
                entity: "role ops".into(),
                expected: 1,
                actual: 2,
            }),
            GovernanceError::Conflict(_)
        ));
        assert!(matches!(
            GovernanceError::from(StoreError::Unexpected(anyhow::anyhow!("disk"))),
            GovernanceError::StoreUnavailable(_)
        ));
    }

    #[test]
    fn authz_errors_are_validation_errors() {
        let err = GovernanceError::from(AuthzError::UnknownSystemRole("root".into()));
        assert!(matches!(err, GovernanceError::ValidationError(_)));
    }
}
