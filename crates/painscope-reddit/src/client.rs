//! HTTP client for the Reddit content source (client-credentials OAuth).
//!
//! Wraps `reqwest` with Reddit-specific error handling, bearer-token
//! management, cursor pagination, and typed response deserialization. Rate
//! limits are retried with bounded back-off inside each operation; auth
//! failures and unknown references surface immediately.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use painscope_core::{SortMode, Source, TimeWindow};

use crate::complaint::{has_complaint_indicators, matched_keyword};
use crate::error::RedditError;
use crate::retry::retry_with_backoff;
use crate::types::{
    epoch_to_datetime, AboutResponse, CommentData, CommunityFlair, CommunityMetadata,
    CommunityRule, FetchedItem, FlairTemplate, Listing, PostData, RulesResponse, TokenResponse,
};

const DEFAULT_AUTH_BASE: &str = "https://www.reddit.com";
const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";
const PAGE_LIMIT: usize = 100;
const COMMENT_FETCH_LIMIT: usize = 500;

/// Credentials for the client-credentials OAuth grant.
#[derive(Debug, Clone)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl RedditConfig {
    /// Build config from environment variables.
    ///
    /// Returns an error string listing any missing variables.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any required env var is not set.
    pub fn from_env() -> Result<Self, String> {
        let mut missing = Vec::new();

        let client_id = std::env::var("REDDIT_CLIENT_ID").ok();
        let client_secret = std::env::var("REDDIT_CLIENT_SECRET").ok();
        let user_agent = std::env::var("REDDIT_USER_AGENT").ok();

        if client_id.is_none() {
            missing.push("REDDIT_CLIENT_ID");
        }
        if client_secret.is_none() {
            missing.push("REDDIT_CLIENT_SECRET");
        }
        if user_agent.is_none() {
            missing.push("REDDIT_USER_AGENT");
        }

        if !missing.is_empty() {
            return Err(format!("missing reddit env vars: {}", missing.join(", ")));
        }

        Ok(Self {
            client_id: client_id.unwrap_or_default(),
            client_secret: client_secret.unwrap_or_default(),
            user_agent: user_agent.unwrap_or_default(),
        })
    }
}

/// Reddit API client holding a valid access token.
pub struct RedditClient {
    client: Client,
    token: String,
    user_agent: String,
    api_base: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl RedditClient {
    /// Create a new client against the production Reddit endpoints, exchanging
    /// client credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`RedditError::Auth`] if the token exchange is rejected, or
    /// [`RedditError::Http`] if the exchange cannot be performed.
    pub async fn new(
        config: &RedditConfig,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, RedditError> {
        Self::with_base_urls(
            config,
            timeout_secs,
            max_retries,
            backoff_base_secs,
            DEFAULT_AUTH_BASE,
            DEFAULT_API_BASE,
        )
        .await
    }

    /// Create a new client with custom base URLs (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`RedditClient::new`].
    pub async fn with_base_urls(
        config: &RedditConfig,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_secs: u64,
        auth_base: &str,
        api_base: &str,
    ) -> Result<Self, RedditError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let token = Self::fetch_token(&client, config, auth_base).await?;

        Ok(Self {
            client,
            token,
            user_agent: config.user_agent.clone(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            max_retries,
            backoff_base_secs,
        })
    }

    async fn fetch_token(
        client: &Client,
        config: &RedditConfig,
        auth_base: &str,
    ) -> Result<String, RedditError> {
        let url = format!("{}/api/v1/access_token", auth_base.trim_end_matches('/'));
        let response = client
            .post(&url)
            .header("User-Agent", &config.user_agent)
            .basic_auth(&config.client_id, Some(&config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RedditError::Auth(format!(
                "token exchange rejected with status {status}"
            )));
        }
        if !status.is_success() {
            return Err(RedditError::Api {
                status: status.as_u16(),
                context: "token exchange".to_owned(),
            });
        }

        let body = response.text().await?;
        let token_resp: TokenResponse =
            serde_json::from_str(&body).map_err(|e| RedditError::Deserialize {
                context: "token exchange".to_owned(),
                source: e,
            })?;

        Ok(token_resp.access_token)
    }

    /// Fetch a community listing in the provider's native order for `sort`.
    ///
    /// Paginates via the `after` cursor until `limit` items pass the filter or
    /// the listing ends. When `keywords` is non-empty, only items whose text
    /// contains at least one keyword (case-insensitive substring) are yielded;
    /// otherwise the complaint-indicator heuristic applies. The sequence is
    /// finite and not restartable — a fresh call re-queries the provider.
    ///
    /// # Errors
    ///
    /// - [`RedditError::NotFound`] for an unknown community.
    /// - [`RedditError::RateLimited`] after retries are exhausted.
    /// - [`RedditError::Auth`], [`RedditError::Http`],
    ///   [`RedditError::Deserialize`], [`RedditError::Api`] as they occur.
    pub async fn fetch_listing(
        &self,
        community: &str,
        sort: SortMode,
        keywords: &[String],
        limit: usize,
        time_window: Option<TimeWindow>,
    ) -> Result<Vec<FetchedItem>, RedditError> {
        let context = format!("r/{community}/{sort}");
        let mut after: Option<String> = None;
        let mut items: Vec<FetchedItem> = Vec::new();

        loop {
            let listing = self
                .fetch_listing_page(community, sort, time_window, after.as_deref(), &context)
                .await?;

            if listing.data.children.is_empty() {
                break;
            }

            for thing in &listing.data.children {
                if let Some(item) = self.listing_item(&thing.data, community, sort, keywords) {
                    items.push(item);
                    if items.len() >= limit {
                        break;
                    }
                }
            }

            if items.len() >= limit {
                break;
            }

            after = listing.data.after;
            if after.is_none() {
                break;
            }
        }

        tracing::debug!(
            community,
            sort = %sort,
            fetched = items.len(),
            "collected Reddit listing items"
        );

        Ok(items)
    }

    async fn fetch_listing_page(
        &self,
        community: &str,
        sort: SortMode,
        time_window: Option<TimeWindow>,
        after: Option<&str>,
        context: &str,
    ) -> Result<Listing, RedditError> {
        let url = format!("{}/r/{community}/{sort}", self.api_base);

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let mut params: Vec<(&str, String)> = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(window) = time_window.filter(|_| sort.supports_time_window()) {
                params.push(("t", window.as_str().to_owned()));
            }
            if let Some(cursor) = after {
                params.push(("after", cursor.to_owned()));
            }
            self.get_json::<Listing>(url.clone(), params, context.to_owned())
        })
        .await
    }

    fn listing_item(
        &self,
        data: &PostData,
        community: &str,
        sort: SortMode,
        keywords: &[String],
    ) -> Option<FetchedItem> {
        let title = data.title.as_deref().unwrap_or_default();
        let selftext = data.selftext.as_deref().unwrap_or_default();
        let content = if selftext.is_empty() {
            title.to_owned()
        } else {
            format!("{title}\n\n{selftext}")
        };

        let keyword_matched = if keywords.is_empty() {
            if !has_complaint_indicators(&content) {
                return None;
            }
            None
        } else {
            Some(matched_keyword(&content, keywords)?.to_owned())
        };

        #[allow(clippy::cast_possible_truncation)]
        let upstream_score = data.score.unwrap_or(0) as i32;

        Some(FetchedItem {
            source: Source::RedditPost,
            source_id: data.id.clone(),
            content,
            author: data.author.clone(),
            community: Some(
                data.subreddit
                    .clone()
                    .unwrap_or_else(|| community.to_owned()),
            ),
            url: data
                .permalink
                .as_deref()
                .map(|p| format!("https://reddit.com{p}")),
            upstream_score,
            posted_at: epoch_to_datetime(data.created_utc),
            metadata: serde_json::json!({
                "sort": sort.as_str(),
                "upvote_ratio": data.upvote_ratio,
                "num_comments": data.num_comments,
                "keyword_matched": keyword_matched,
            }),
        })
    }

    /// Fetch a post's comment tree and retain complaint-bearing comments.
    ///
    /// At most `limit` comments are examined (depth-first, provider order);
    /// a comment is retained only if its score is at least
    /// `min_upstream_score` and its body matches the complaint-indicator
    /// heuristic. Retained comments carry `depth` and `is_op` metadata.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`RedditClient::fetch_listing`]; an unknown post is
    /// [`RedditError::NotFound`].
    pub async fn fetch_comments(
        &self,
        post_id: &str,
        limit: usize,
        min_upstream_score: i64,
    ) -> Result<Vec<FetchedItem>, RedditError> {
        let context = format!("comments/{post_id}");
        let url = format!("{}/comments/{post_id}", self.api_base);

        let listings: Vec<serde_json::Value> = retry_with_backoff(
            self.max_retries,
            self.backoff_base_secs,
            || {
                self.get_json::<Vec<serde_json::Value>>(
                    url.clone(),
                    vec![("limit", COMMENT_FETCH_LIMIT.to_string())],
                    context.clone(),
                )
            },
        )
        .await?;

        let post_title = listings
            .first()
            .and_then(|l| l.pointer("/data/children/0/data/title"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        let comment_children = listings
            .get(1)
            .and_then(|l| l.pointer("/data/children"))
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut collector = CommentCollector {
            post_id,
            post_title: post_title.as_deref(),
            min_upstream_score,
            limit,
            examined: 0,
            items: Vec::new(),
        };
        collector.walk(&comment_children, 0);

        tracing::debug!(
            post_id,
            examined = collector.examined,
            retained = collector.items.len(),
            "collected complaint comments"
        );

        Ok(collector.items)
    }

    /// Fetch subscriber counts, flairs, and rules for a community.
    ///
    /// A pure read with no side effect on the store. Flair and rule fetch
    /// failures degrade to empty lists; the about record itself is required.
    ///
    /// # Errors
    ///
    /// [`RedditError::NotFound`] for an unknown community; otherwise the same
    /// taxonomy as [`RedditClient::fetch_listing`].
    pub async fn fetch_community_metadata(
        &self,
        community: &str,
    ) -> Result<CommunityMetadata, RedditError> {
        let about_context = format!("r/{community}/about");
        let about_url = format!("{}/r/{community}/about", self.api_base);
        let about: AboutResponse = retry_with_backoff(
            self.max_retries,
            self.backoff_base_secs,
            || self.get_json::<AboutResponse>(about_url.clone(), Vec::new(), about_context.clone()),
        )
        .await?;

        let flairs = match self
            .get_json::<Vec<FlairTemplate>>(
                format!("{}/r/{community}/api/link_flair", self.api_base),
                Vec::new(),
                format!("r/{community}/api/link_flair"),
            )
            .await
        {
            Ok(templates) => templates
                .into_iter()
                .map(|f| CommunityFlair {
                    id: f.id.unwrap_or_default(),
                    text: f.text.unwrap_or_default(),
                })
                .collect(),
            Err(e) => {
                tracing::debug!(community, error = %e, "could not fetch link flairs");
                Vec::new()
            }
        };

        let rules = match self
            .get_json::<RulesResponse>(
                format!("{}/r/{community}/about/rules", self.api_base),
                Vec::new(),
                format!("r/{community}/about/rules"),
            )
            .await
        {
            Ok(response) => response
                .rules
                .into_iter()
                .map(|r| CommunityRule {
                    short_name: r.short_name,
                    description: r.description.unwrap_or_default(),
                    kind: r.kind.unwrap_or_else(|| "all".to_owned()),
                })
                .collect(),
            Err(e) => {
                tracing::debug!(community, error = %e, "could not fetch community rules");
                Vec::new()
            }
        };

        let data = about.data;
        let name = data
            .display_name
            .unwrap_or_else(|| community.to_owned());

        Ok(CommunityMetadata {
            url: format!("https://reddit.com/r/{name}"),
            name,
            title: data.title.unwrap_or_default(),
            description: data.public_description.unwrap_or_default(),
            subscribers: data.subscribers.unwrap_or(0),
            active_users: data.active_user_count.unwrap_or(0),
            created_at: epoch_to_datetime(data.created_utc),
            nsfw: data.over18.unwrap_or(false),
            flairs,
            rules,
        })
    }

    /// Sends a GET request, maps the status onto the error taxonomy, and
    /// parses the body as `T`.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        params: Vec<(&str, String)>,
        context: String,
    ) -> Result<T, RedditError> {
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", &self.user_agent)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(RedditError::Auth(format!(
                    "request to {context} rejected with status {status}"
                )));
            }
            StatusCode::NOT_FOUND => {
                return Err(RedditError::NotFound { context });
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(RedditError::RateLimited { context });
            }
            s if !s.is_success() => {
                return Err(RedditError::Api {
                    status: s.as_u16(),
                    context,
                });
            }
            _ => {}
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| RedditError::Deserialize { context, source: e })
    }
}

/// Depth-first walk over a comment tree, bounding the number of comments
/// examined and retaining complaint-bearing ones.
struct CommentCollector<'a> {
    post_id: &'a str,
    post_title: Option<&'a str>,
    min_upstream_score: i64,
    limit: usize,
    examined: usize,
    items: Vec<FetchedItem>,
}

impl CommentCollector<'_> {
    fn walk(&mut self, children: &[serde_json::Value], depth: u32) {
        for child in children {
            if self.examined >= self.limit {
                return;
            }

            // "more" stubs and anything without a body are skipped, not counted.
            if child.get("kind").and_then(serde_json::Value::as_str) == Some("more") {
                continue;
            }
            let Some(data) = child.get("data") else {
                continue;
            };
            let Ok(comment) = serde_json::from_value::<CommentData>(data.clone()) else {
                continue;
            };
            let Some(body) = comment.body.clone().filter(|b| !b.is_empty()) else {
                continue;
            };

            self.examined += 1;

            let score = comment.score.unwrap_or(0);
            if score >= self.min_upstream_score && has_complaint_indicators(&body) {
                #[allow(clippy::cast_possible_truncation)]
                let upstream_score = score as i32;
                self.items.push(FetchedItem {
                    source: Source::RedditComment,
                    source_id: comment.id.clone(),
                    content: body,
                    author: comment.author.clone(),
                    community: comment.subreddit.clone(),
                    url: comment
                        .permalink
                        .as_deref()
                        .map(|p| format!("https://reddit.com{p}")),
                    upstream_score,
                    posted_at: epoch_to_datetime(comment.created_utc),
                    metadata: serde_json::json!({
                        "parent_post_id": self.post_id,
                        "parent_post_title": self.post_title,
                        "depth": depth,
                        "is_op": comment.is_submitter.unwrap_or(false),
                    }),
                });
            }

            if let Some(nested) = comment
                .replies
                .as_ref()
                .and_then(|r| r.pointer("/data/children"))
                .and_then(serde_json::Value::as_array)
            {
                self.walk(nested, depth + 1);
            }
        }
    }
}
