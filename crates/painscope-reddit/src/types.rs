//! Wire shapes for the Reddit API and the adapter's output types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use painscope_core::Source;

// ---------------------------------------------------------------------------
// Wire types (deserialized defensively; absent fields default)
// ---------------------------------------------------------------------------

/// Reddit OAuth token response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
}

/// Reddit listing wrapper.
#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub(crate) data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub(crate) children: Vec<Thing>,
    #[serde(default)]
    pub(crate) after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thing {
    pub(crate) data: PostData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostData {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) selftext: Option<String>,
    #[serde(default)]
    pub(crate) author: Option<String>,
    #[serde(default)]
    pub(crate) permalink: Option<String>,
    #[serde(default)]
    pub(crate) subreddit: Option<String>,
    #[serde(default)]
    pub(crate) score: Option<i64>,
    #[serde(default)]
    pub(crate) num_comments: Option<i64>,
    #[serde(default)]
    pub(crate) upvote_ratio: Option<f64>,
    #[serde(default)]
    pub(crate) created_utc: Option<f64>,
}

/// One node of a comment tree. `replies` is either an empty string or a
/// nested listing, so it stays untyped until the walk descends into it.
#[derive(Debug, Deserialize)]
pub(crate) struct CommentData {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) body: Option<String>,
    #[serde(default)]
    pub(crate) author: Option<String>,
    #[serde(default)]
    pub(crate) permalink: Option<String>,
    #[serde(default)]
    pub(crate) subreddit: Option<String>,
    #[serde(default)]
    pub(crate) score: Option<i64>,
    #[serde(default)]
    pub(crate) is_submitter: Option<bool>,
    #[serde(default)]
    pub(crate) created_utc: Option<f64>,
    #[serde(default)]
    pub(crate) replies: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AboutResponse {
    pub(crate) data: AboutData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AboutData {
    #[serde(default)]
    pub(crate) display_name: Option<String>,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) public_description: Option<String>,
    #[serde(default)]
    pub(crate) subscribers: Option<i64>,
    #[serde(default)]
    pub(crate) active_user_count: Option<i64>,
    #[serde(default)]
    pub(crate) created_utc: Option<f64>,
    #[serde(default)]
    pub(crate) over18: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FlairTemplate {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RulesResponse {
    #[serde(default)]
    pub(crate) rules: Vec<RuleData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RuleData {
    pub(crate) short_name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) kind: Option<String>,
}

// ---------------------------------------------------------------------------
// Adapter output types
// ---------------------------------------------------------------------------

/// One fetched unit of content, ready for persistence as a raw item.
#[derive(Debug, Clone)]
pub struct FetchedItem {
    pub source: Source,
    pub source_id: String,
    pub content: String,
    pub author: Option<String>,
    pub community: Option<String>,
    pub url: Option<String>,
    pub upstream_score: i32,
    /// Provider-side creation time; callers fall back to the scrape time.
    pub posted_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CommunityFlair {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CommunityRule {
    pub short_name: String,
    pub description: String,
    pub kind: String,
}

/// Community discovery record. A pure read — never persisted by the adapter.
#[derive(Debug, Clone)]
pub struct CommunityMetadata {
    pub name: String,
    pub title: String,
    pub description: String,
    pub subscribers: i64,
    pub active_users: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub nsfw: bool,
    pub url: String,
    pub flairs: Vec<CommunityFlair>,
    pub rules: Vec<CommunityRule>,
}

pub(crate) fn epoch_to_datetime(secs: Option<f64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| {
        #[allow(clippy::cast_possible_truncation)]
        let whole_secs = s as i64;
        DateTime::<Utc>::from_timestamp(whole_secs, 0)
    })
}
