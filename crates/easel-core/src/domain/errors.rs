//! Errors that are not result envelopes.

use super::ids::TaskId;
use super::result::{ResultCode, ResultEnvelope};

/// Failure of a [`TaskStore`](crate::ports::TaskStore) operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode task: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    /// Persistence failures end the pipeline step that hit them.
    pub fn into_envelope<T>(self) -> ResultEnvelope<T> {
        ResultEnvelope::failure(ResultCode::PersistenceFailed, self.to_string())
    }
}
