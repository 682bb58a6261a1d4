use serde::{Deserialize, Serialize};

/// Error payload returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Query parameters accepted by the star-neighbours endpoint
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    /// Per-request GitHub token override
    pub gh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}
