use increator_kv::KVError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    /// Malformed or missing required profile fields. Not retryable.
    #[error("identity: invalid input: {0}")]
    Validation(String),

    /// A referenced profile or identity is absent.
    #[error("identity: not found: {0}")]
    NotFound(String),

    /// A verified platform handle is already held by another profile.
    #[error("identity: conflict: {0}")]
    Conflict(String),

    /// The backing store failed. Retryable by the caller.
    #[error("identity: {op} {target}: {cause}")]
    Storage {
        op: &'static str,
        target: String,
        cause: String,
    },

    #[error("identity: serialization error: {0}")]
    Serialization(String),
}

impl IdentityError {
    pub(crate) fn storage(op: &'static str, target: impl Into<String>, err: KVError) -> Self {
        IdentityError::Storage {
            op,
            target: target.into(),
            cause: err.to_string(),
        }
    }
}

impl From<KVError> for IdentityError {
    fn from(err: KVError) -> Self {
        match err {
            KVError::Backend { op, cause } => IdentityError::Storage {
                op,
                target: String::new(),
                cause,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
