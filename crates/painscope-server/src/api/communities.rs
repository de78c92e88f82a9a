use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use painscope_reddit::{CommunityMetadata, RedditClient, RedditConfig, RedditError};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct CommunityItem {
    pub name: String,
    pub title: String,
    pub description: String,
    pub subscribers: i64,
    pub active_users: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub nsfw: bool,
    pub url: String,
    pub flairs: Vec<FlairItem>,
    pub rules: Vec<RuleItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct FlairItem {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub(super) struct RuleItem {
    pub short_name: String,
    pub description: String,
    pub kind: String,
}

impl From<CommunityMetadata> for CommunityItem {
    fn from(metadata: CommunityMetadata) -> Self {
        Self {
            name: metadata.name,
            title: metadata.title,
            description: metadata.description,
            subscribers: metadata.subscribers,
            active_users: metadata.active_users,
            created_at: metadata.created_at,
            nsfw: metadata.nsfw,
            url: metadata.url,
            flairs: metadata
                .flairs
                .into_iter()
                .map(|f| FlairItem {
                    id: f.id,
                    text: f.text,
                })
                .collect(),
            rules: metadata
                .rules
                .into_iter()
                .map(|r| RuleItem {
                    short_name: r.short_name,
                    description: r.description,
                    kind: r.kind,
                })
                .collect(),
        }
    }
}

fn map_reddit_error(request_id: String, error: &RedditError) -> ApiError {
    match error {
        RedditError::NotFound { context } => ApiError::new(
            request_id,
            "not_found",
            format!("unknown community: {context}"),
        ),
        RedditError::RateLimited { .. } => ApiError::new(
            request_id,
            "rate_limited",
            "content source rate limit reached; retry later",
        ),
        other => {
            tracing::error!(error = %other, "community metadata fetch failed");
            ApiError::new(request_id, "upstream_error", "content source unavailable")
        }
    }
}

/// Discovery read used to choose which communities to ingest. No store side
/// effect.
pub(super) async fn get_community(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(community): Path<String>,
) -> Result<Json<ApiResponse<CommunityItem>>, ApiError> {
    let reddit_config = RedditConfig::from_env()
        .map_err(|msg| ApiError::new(req_id.0.clone(), "upstream_error", msg))?;

    let client = RedditClient::new(
        &reddit_config,
        state.config.request_timeout_secs,
        state.config.max_retries,
        state.config.retry_backoff_base_secs,
    )
    .await
    .map_err(|e| map_reddit_error(req_id.0.clone(), &e))?;

    let metadata = client
        .fetch_community_metadata(&community)
        .await
        .map_err(|e| map_reddit_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: CommunityItem::from(metadata),
        meta: ResponseMeta::new(req_id.0),
    }))
}
