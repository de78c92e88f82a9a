use thiserror::Error;

/// Errors returned by the extraction model client.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Network or TLS failure, including timeouts. Transient.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid or rejected model credentials. Fatal.
    #[error("extraction model authentication failed: {0}")]
    Auth(String),

    /// The model service asked us to back off. Transient.
    #[error("extraction model rate limited")]
    RateLimited,

    /// Non-success status from the model service.
    #[error("extraction model error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The HTTP envelope could not be deserialized.
    #[error("extraction response parse error: {source}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
    },

    /// The model's output could not be interpreted as the expected schema.
    /// The affected item is skipped and retried on a later pass.
    #[error("extraction output failed validation: {0}")]
    Validation(String),
}

impl ExtractError {
    /// Whether a later pass may succeed where this call failed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ExtractError::Http(_) | ExtractError::RateLimited => true,
            ExtractError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
