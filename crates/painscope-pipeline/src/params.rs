//! Recognized run parameters for each job type.
//!
//! These structs double as the trigger-request bodies at the HTTP boundary
//! and as the `parameters` JSONB recorded on the job row. Unknown fields are
//! rejected at deserialization rather than passed through silently.

use serde::{Deserialize, Serialize};

use painscope_core::{SortMode, TimeWindow};

fn default_sort() -> SortMode {
    SortMode::Hot
}

fn default_limit() -> usize {
    100
}

fn default_comments_per_post() -> usize {
    100
}

fn default_min_comment_score() -> i64 {
    1
}

/// Content sources with an implemented adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestSource {
    #[default]
    Reddit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestParams {
    #[serde(default)]
    pub source: IngestSource,
    pub community: String,
    #[serde(default = "default_sort")]
    pub sort_mode: SortMode,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
    /// Also walk the comment trees of the first few matched posts.
    #[serde(default)]
    pub include_comments: bool,
    #[serde(default = "default_comments_per_post")]
    pub comments_per_post: usize,
    #[serde(default = "default_min_comment_score")]
    pub min_comment_score: i64,
}

impl IngestParams {
    #[must_use]
    pub fn for_community(community: &str, sort_mode: SortMode, keywords: Vec<String>, limit: usize) -> Self {
        Self {
            source: IngestSource::Reddit,
            community: community.to_owned(),
            sort_mode,
            keywords,
            limit,
            time_window: None,
            include_comments: false,
            comments_per_post: default_comments_per_post(),
            min_comment_score: default_min_comment_score(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SentimentParams {
    /// Batch size cap; the configured default applies when absent.
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ExtractionParams {
    /// Batch size cap; the configured default applies when absent.
    #[serde(default)]
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_params_fill_defaults() {
        let params: IngestParams =
            serde_json::from_str(r#"{"community": "saas"}"#).unwrap();
        assert_eq!(params.source, IngestSource::Reddit);
        assert_eq!(params.community, "saas");
        assert_eq!(params.sort_mode, SortMode::Hot);
        assert!(params.keywords.is_empty());
        assert_eq!(params.limit, 100);
        assert!(params.time_window.is_none());
        assert!(!params.include_comments);
        assert_eq!(params.comments_per_post, 100);
        assert_eq!(params.min_comment_score, 1);
    }

    #[test]
    fn unknown_fields_are_rejected_at_the_boundary() {
        let result = serde_json::from_str::<IngestParams>(
            r#"{"community": "saas", "subredit": "typo"}"#,
        );
        assert!(result.is_err(), "unrecognized configuration must be rejected");

        let result = serde_json::from_str::<SentimentParams>(r#"{"limit": 5, "batch": 5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn sources_without_an_adapter_are_rejected() {
        let result = serde_json::from_str::<IngestParams>(
            r#"{"source": "twitter", "community": "anything"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn ingest_params_round_trip_through_job_parameters() {
        let params: IngestParams = serde_json::from_str(
            r#"{"community": "saas", "sort_mode": "top", "time_window": "week",
                "keywords": ["slow"], "limit": 25, "include_comments": true}"#,
        )
        .unwrap();
        let json = serde_json::to_value(&params).unwrap();
        let back: IngestParams = serde_json::from_value(json).unwrap();
        assert_eq!(back.sort_mode, SortMode::Top);
        assert_eq!(back.time_window, Some(TimeWindow::Week));
        assert_eq!(back.limit, 25);
        assert!(back.include_comments);
    }
}
