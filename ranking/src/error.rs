use increator_embed::EmbedError;
use increator_vecstore::VecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RankingError {
    /// The vector index or embedder failed. Retryable with backoff; nothing
    /// in this crate retries on its own.
    #[error("ranking: {op}: upstream unavailable: {cause}")]
    UpstreamUnavailable { op: &'static str, cause: String },

    #[error("ranking: invalid job {id:?}: {reason}")]
    InvalidJob { id: String, reason: String },
}

impl RankingError {
    pub(crate) fn upstream(op: &'static str, cause: impl std::fmt::Display) -> Self {
        RankingError::UpstreamUnavailable {
            op,
            cause: cause.to_string(),
        }
    }
}

impl From<VecError> for RankingError {
    fn from(e: VecError) -> Self {
        RankingError::upstream("index", e)
    }
}

impl From<EmbedError> for RankingError {
    fn from(e: EmbedError) -> Self {
        RankingError::upstream("embed", e)
    }
}

pub type Result<T> = std::result::Result<T, RankingError>;
