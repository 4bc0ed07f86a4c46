use thiserror::Error;

#[derive(Error, Debug)]
pub enum VecError {
    #[error("vecstore: dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("vecstore: invalid record: {0}")]
    InvalidRecord(String),

    #[error("vecstore: storage: {0}")]
    Storage(String),

    #[error("vecstore: serialization: {0}")]
    Serialization(String),

    /// Remote index unreachable or returned an error.
    #[error("vecstore: upstream: {0}")]
    Upstream(String),
}

impl From<increator_kv::KVError> for VecError {
    fn from(e: increator_kv::KVError) -> Self {
        VecError::Storage(e.to_string())
    }
}
