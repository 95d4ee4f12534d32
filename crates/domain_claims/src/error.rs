//! Claims domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the claims domain
///
/// Every variant is scoped to a single operation and carries enough context
/// for the API layer to render a user-facing message.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// The claim was changed by someone else since it was loaded
    #[error("Claim {claim} was modified by another user (expected version {expected}, found {found}); reload and resubmit")]
    ConcurrencyConflict {
        claim: String,
        expected: i64,
        found: i64,
    },

    /// A claim number or external id collided with an existing record
    #[error("Duplicate {entity}: {field} '{value}' already exists")]
    UniquenessViolation {
        entity: String,
        field: String,
        value: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// All sequence numbers for the day are taken
    #[error("Claim number sequence exhausted for {0}")]
    SequenceExhausted(String),

    #[error("Storage error: {0}")]
    Storage(#[source] PortError),
}

impl ClaimError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClaimError::Validation(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        ClaimError::PermissionDenied(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        ClaimError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Returns true if the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClaimError::UniquenessViolation { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ClaimError::ConcurrencyConflict { .. })
    }
}

impl From<PortError> for ClaimError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::VersionConflict { id, expected, found, .. } => ClaimError::ConcurrencyConflict {
                claim: id,
                expected,
                found,
            },
            PortError::Duplicate { entity_type, field, value } => ClaimError::UniquenessViolation {
                entity: entity_type,
                field,
                value,
            },
            PortError::NotFound { entity_type, id } => ClaimError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Validation { message, .. } => ClaimError::Validation(message),
            PortError::Conflict { message } => ClaimError::Validation(message),
            other => ClaimError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_maps_to_concurrency_conflict() {
        let err: ClaimError = PortError::version_conflict("Claim", "CLM-20240101-0001", 3, 4).into();
        assert!(err.is_conflict());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_duplicate_is_retryable() {
        let err: ClaimError = PortError::duplicate("Claim", "claim_number", "CLM-20240101-0001").into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_connection_maps_to_storage() {
        let err: ClaimError = PortError::connection("pool timed out").into();
        assert!(matches!(err, ClaimError::Storage(_)));
    }
}
