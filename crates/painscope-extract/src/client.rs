//! HTTP client for the generative extraction model.
//!
//! Speaks the messages wire format: one user turn carrying the complaint and
//! the output schema, one text block back carrying either a JSON pain-point
//! record or the explicit none-signal.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::ExtractError;
use crate::types::ModelOutput;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-opus-5";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Credentials and model selection for the extraction service.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub api_key: String,
    pub model: String,
}

impl ExtractorConfig {
    /// Build config from environment variables. `EXTRACTOR_MODEL` is optional.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `EXTRACTOR_API_KEY` is not set.
    pub fn from_env() -> Result<Self, String> {
        let api_key = std::env::var("EXTRACTOR_API_KEY")
            .map_err(|_| "missing extractor env vars: EXTRACTOR_API_KEY".to_owned())?;
        let model =
            std::env::var("EXTRACTOR_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
        Ok(Self { api_key, model })
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for the extraction model endpoint.
pub struct ExtractorClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ExtractorClient {
    /// Creates a new client pointed at the production endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &ExtractorConfig, timeout_secs: u64) -> Result<Self, ExtractError> {
        Self::with_base_url(config, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(
        config: &ExtractorConfig,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Asks the model to extract a structured pain point from one complaint.
    ///
    /// Returns `Ok(None)` when the model signals that no pain point is
    /// present. The returned [`ModelOutput`] is raw — callers run it through
    /// [`crate::repair`] before persisting.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::Auth`] on rejected credentials.
    /// - [`ExtractError::RateLimited`] / [`ExtractError::Http`] /
    ///   [`ExtractError::Api`] on transport-level failures.
    /// - [`ExtractError::Validation`] when the model's text cannot be
    ///   interpreted as the expected JSON shape.
    pub async fn extract(&self, text: &str) -> Result<Option<ModelOutput>, ExtractError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [ { "role": "user", "content": build_prompt(text) } ],
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ExtractError::Auth(format!(
                    "model endpoint rejected credentials with status {status}"
                )));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(ExtractError::RateLimited),
            s if !s.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(ExtractError::Api {
                    status: s.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let raw = response.text().await?;
        let parsed: MessagesResponse =
            serde_json::from_str(&raw).map_err(|source| ExtractError::Deserialize { source })?;

        let Some(reply) = parsed
            .content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.as_deref())
        else {
            return Err(ExtractError::Validation(
                "model response carried no text block".to_owned(),
            ));
        };

        let output = parse_model_reply(reply)?;
        if output.no_pain_point {
            tracing::debug!("model signalled no pain point");
            return Ok(None);
        }
        Ok(Some(output))
    }
}

/// Pulls the JSON object out of the model's reply, tolerating prose around
/// it, and parses it into [`ModelOutput`].
fn parse_model_reply(reply: &str) -> Result<ModelOutput, ExtractError> {
    let candidate = match serde_json::from_str::<ModelOutput>(reply) {
        Ok(output) => return Ok(output),
        Err(_) => outermost_json_object(reply).ok_or_else(|| {
            ExtractError::Validation(format!(
                "model reply carried no JSON object: {:.80}",
                reply
            ))
        })?,
    };

    serde_json::from_str::<ModelOutput>(candidate).map_err(|e| {
        ExtractError::Validation(format!("model reply did not match the schema: {e}"))
    })
}

fn outermost_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn build_prompt(text: &str) -> String {
    format!(
        "Analyze this customer complaint and extract the pain point in structured form.\n\
         \n\
         COMPLAINT:\n\
         {text}\n\
         \n\
         Respond ONLY with a single JSON object, no surrounding prose:\n\
         {{\n\
           \"problem_statement\": one clear sentence describing the core problem,\n\
           \"category\": one of [\"pricing\", \"usability\", \"features\", \"support\", \"performance\", \"bugs\", \"integration\", \"other\"],\n\
           \"severity\": one of [\"critical\", \"high\", \"medium\", \"low\"],\n\
           \"opportunity_score\": integer 0-100 estimating business potential,\n\
           \"tags\": 2-5 relevant keywords,\n\
           \"context\": a short supporting excerpt or note on when this hurts\n\
         }}\n\
         \n\
         If the text contains no actionable complaint, respond with exactly:\n\
         {{\"no_pain_point\": true}}"
    )
}
