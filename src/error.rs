use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a blob reference could not be turned into a fetchable URL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("access denied to blob: {0}")]
    AccessDenied(String),

    #[error("blob backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] rquest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Subscription failed: {0}")]
    Subscription(String),

    #[error("Image resolution failed: {0}")]
    ImageResolution(#[from] ResolveError),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Forbidden - Access denied")]
    Forbidden,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Roster view is already active")]
    AlreadyActive,
}
