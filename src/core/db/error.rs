use uuid::Uuid;

use crate::core::scenario::StatusError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("project {0} not found")]
    NotFound(Uuid),

    #[error("project store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("project store answered {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid project payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid stored value: {0}")]
    Invalid(String),

    #[error(transparent)]
    Transition(#[from] StatusError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
