use thiserror::Error;
use wacore::store::StoreError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("session storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("failed to (de)serialize buffered messages: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("pipeline is missing its {0}")]
    MissingComponent(&'static str),
}
