use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid or missing GitHub credentials")]
    Unauthorized,

    #[error("Rate limited: reset at {reset_at:?}")]
    RateLimited { reset_at: Option<u64> },

    #[error("Fetch failed for {resource}: {cause}")]
    FetchFailed { resource: String, cause: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
