use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value {value:?} for environment variable {key}")]
    InvalidVar { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("no user is signed in")]
    NotSignedIn,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Every variant is a synthesis failure; the variants only carry the cause for logging.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("query is empty")]
    EmptyQuery,
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("backend returned no content")]
    EmptyResponse,
    #[error("malformed backend response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response violates schema: {0}")]
    SchemaViolation(String),
}
