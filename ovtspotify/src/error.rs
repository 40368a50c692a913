//! Error types for the Spotify client

/// Result type alias for Spotify operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the Spotify Web API
///
/// None of these ever reach the public resolution surface: the now-playing
/// provider absorbs every variant into absence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Token endpoint rejected the exchange
    #[error("Token endpoint returned status {0}")]
    TokenEndpoint(u16),

    /// Token endpoint answered with an unusable payload
    #[error("Malformed token payload: {0}")]
    MalformedTokenPayload(String),
}

impl Error {
    /// Create a malformed-token-payload error
    pub fn malformed_token(msg: impl Into<String>) -> Self {
        Self::MalformedTokenPayload(msg.into())
    }
}
