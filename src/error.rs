use thiserror::Error;

/// Expected domain failure conditions. Operations return these rather than
/// panicking; anything the persistence layer reports bubbles up as
/// `Upstream`.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("merge request '{id}' is already closed ({status})")]
    AlreadyClosed { id: String, status: &'static str },

    #[error("branch '{branch_id}' has no tip version")]
    NoTipVersion { branch_id: String },

    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),

    /// A multi-step workflow completed some steps and failed a later one.
    /// There is no automatic rollback; the message names the failing step
    /// so an operator can remediate.
    #[error("{operation} failed at step '{step}': {source}")]
    PartialFailure {
        operation: &'static str,
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn partial(operation: &'static str, step: &'static str, source: anyhow::Error) -> Self {
        DomainError::PartialFailure {
            operation,
            step,
            source,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
