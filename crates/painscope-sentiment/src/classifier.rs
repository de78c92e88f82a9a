//! HTTP client for the external text-classification service.
//!
//! The service runs a binary sentiment model behind a single POST endpoint
//! and returns `{"result": [{"label", "score"}], "success": bool}`. Labels
//! outside the known pair map to `neutral` rather than failing the item.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use painscope_core::SentimentLabel;

use crate::error::SentimentError;

/// Classifier input is truncated to this many characters; the model's own
/// input window is shorter than typical scraped posts.
const MAX_CLASSIFIER_CHARS: usize = 1000;

/// Credentials and endpoint for the classifier service.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Full model-run URL, e.g.
    /// `https://api.cloudflare.com/client/v4/accounts/{id}/ai/run/@cf/huggingface/distilbert-sst-2-int8`.
    pub run_url: String,
    pub api_token: String,
}

impl ClassifierConfig {
    /// Build config from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Err` listing any missing variables.
    pub fn from_env() -> Result<Self, String> {
        let mut missing = Vec::new();

        let run_url = std::env::var("SENTIMENT_RUN_URL").ok();
        let api_token = std::env::var("SENTIMENT_API_TOKEN").ok();

        if run_url.is_none() {
            missing.push("SENTIMENT_RUN_URL");
        }
        if api_token.is_none() {
            missing.push("SENTIMENT_API_TOKEN");
        }

        if !missing.is_empty() {
            return Err(format!(
                "missing sentiment env vars: {}",
                missing.join(", ")
            ));
        }

        Ok(Self {
            run_url: run_url.unwrap_or_default(),
            api_token: api_token.unwrap_or_default(),
        })
    }
}

/// One classification: a label with the model's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: SentimentLabel,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    #[serde(default)]
    result: Vec<LabelScore>,
    #[serde(default)]
    success: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Client for the classification endpoint.
pub struct ClassifierClient {
    client: Client,
    run_url: String,
    api_token: String,
}

impl ClassifierClient {
    /// Creates a new classifier client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &ClassifierConfig, timeout_secs: u64) -> Result<Self, SentimentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            run_url: config.run_url.clone(),
            api_token: config.api_token.clone(),
        })
    }

    /// Classifies one text, returning its label and confidence.
    ///
    /// # Errors
    ///
    /// - [`SentimentError::Auth`] on rejected credentials.
    /// - [`SentimentError::RateLimited`] on HTTP 429.
    /// - [`SentimentError::Http`] on network failure or timeout.
    /// - [`SentimentError::Deserialize`] on an unexpected response shape.
    /// - [`SentimentError::Api`] on any other failure.
    pub async fn classify(&self, text: &str) -> Result<Classification, SentimentError> {
        let truncated: String = text.chars().take(MAX_CLASSIFIER_CHARS).collect();

        let response = self
            .client
            .post(&self.run_url)
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({ "text": truncated }))
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SentimentError::Auth(format!(
                    "classifier rejected credentials with status {status}"
                )));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(SentimentError::RateLimited),
            s if !s.is_success() => {
                return Err(SentimentError::Api(format!(
                    "classifier returned status {s}"
                )));
            }
            _ => {}
        }

        let body = response.text().await?;
        let parsed: RunResponse =
            serde_json::from_str(&body).map_err(|source| SentimentError::Deserialize { source })?;

        if parsed.success == Some(false) {
            return Err(SentimentError::Api(
                "classifier reported success=false".to_owned(),
            ));
        }

        let Some(top) = parsed.result.first() else {
            return Err(SentimentError::Api(
                "classifier returned an empty result set".to_owned(),
            ));
        };

        let classification = Classification {
            label: map_label(&top.label),
            confidence: top.score.clamp(0.0, 1.0),
        };
        tracing::trace!(
            label = %classification.label,
            confidence = classification.confidence,
            "classified text"
        );
        Ok(classification)
    }
}

/// Maps provider labels onto the closed label set. Anything unrecognized is
/// treated as neutral, which the gate never admits.
fn map_label(raw: &str) -> SentimentLabel {
    match raw.to_ascii_uppercase().as_str() {
        "NEGATIVE" => SentimentLabel::Negative,
        "POSITIVE" => SentimentLabel::Positive,
        _ => SentimentLabel::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_labels_map_case_insensitively() {
        assert_eq!(map_label("NEGATIVE"), SentimentLabel::Negative);
        assert_eq!(map_label("negative"), SentimentLabel::Negative);
        assert_eq!(map_label("Positive"), SentimentLabel::Positive);
    }

    #[test]
    fn unknown_labels_become_neutral() {
        assert_eq!(map_label("LABEL_2"), SentimentLabel::Neutral);
        assert_eq!(map_label(""), SentimentLabel::Neutral);
    }
}
