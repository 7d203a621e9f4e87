use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum KleoError {
    #[error("rate limited: try again in {formatted}")]
    RateLimited {
        time_remaining_ms: i64,
        formatted: String,
    },

    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type KleoResult<T> = Result<T, KleoError>;
