use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error writing sink record: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize sink record: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type SinkResult<T> = Result<T, SinkError>;
