use thiserror::Error;

/// Errors returned by the sentiment classifier client.
#[derive(Debug, Error)]
pub enum SentimentError {
    /// Network or TLS failure, including timeouts. Transient.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid or rejected classifier credentials. Fatal.
    #[error("classifier authentication failed: {0}")]
    Auth(String),

    /// The classifier asked us to back off (quota/rate ceiling). Transient.
    #[error("classifier rate limited")]
    RateLimited,

    /// The response body did not match the expected shape.
    #[error("classifier response parse error: {source}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
    },

    /// Any other non-success status or application-level failure.
    #[error("classifier error: {0}")]
    Api(String),
}

impl SentimentError {
    /// Whether a later pass may succeed where this call failed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, SentimentError::Http(_) | SentimentError::RateLimited)
    }
}
