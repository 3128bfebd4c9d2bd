use thiserror::Error;

use deptguard_auth::AuthzError;
use deptguard_core::{DomainError, PrincipalId};

use crate::store::StoreError;

/// Failure of a user-management operation.
///
/// Each variant maps to one client-facing outcome; see [`UserServiceError::code`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserServiceError {
    /// The policy denied the action.
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// Inactive accounts may not act at all, whatever the policy says.
    #[error("account '{0}' is inactive")]
    InactiveActor(PrincipalId),

    #[error("user not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Store(String),
}

impl UserServiceError {
    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "forbidden",
            Self::InactiveActor(_) => "inactive_account",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation_error",
            Self::Store(_) => "store_error",
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_) | Self::InactiveActor(_))
    }
}

impl From<StoreError> for UserServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id.to_string()),
            StoreError::DuplicateId(_) | StoreError::DuplicateEmail(_) => {
                Self::Conflict(err.to_string())
            }
            StoreError::Storage(msg) => Self::Store(msg),
        }
    }
}

impl From<DomainError> for UserServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
        }
    }
}
