use thiserror::Error;

/// Errors returned by the Reddit content adapter.
#[derive(Debug, Error)]
pub enum RedditError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid or rejected credentials. Fatal — never retried.
    #[error("Reddit authentication failed: {0}")]
    Auth(String),

    /// The provider asked us to back off (HTTP 429).
    #[error("Reddit rate limited request to {context}")]
    RateLimited { context: String },

    /// Unknown community or post reference. Distinct from rate limiting.
    #[error("Reddit resource not found: {context}")]
    NotFound { context: String },

    /// The response body could not be deserialized into the expected shape.
    #[error("Reddit response parse error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Any other non-success status from the API.
    #[error("Reddit API error ({status}) for {context}")]
    Api { status: u16, context: String },
}
