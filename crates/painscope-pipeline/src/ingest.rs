//! Ingest stage: fetch content from the source adapter and persist it with
//! dedup accounting.

use chrono::Utc;
use sqlx::PgPool;

use painscope_core::AppConfig;
use painscope_db::{JobCounters, NewRawItem, RawItemInsert};
use painscope_reddit::{FetchedItem, RedditClient, RedditConfig, RedditError};

use crate::{CancelFlag, IngestParams, PipelineError, CANCELLED_DETAIL};

/// Posts whose comment trees are walked when `include_comments` is set.
/// Bounded to keep one run inside the provider's rate budget.
const COMMENT_POST_CAP: usize = 10;

/// Runs one ingest job to termination.
///
/// The job row identified by `job_id` must be `pending`; it always ends
/// `succeeded` or `failed`. Fetch-level failures (auth, rate-limit
/// exhaustion, unknown community) fail the job with the error surfaced
/// verbatim; duplicates are counted, never errors.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] only when the job row itself cannot be
/// read or written.
pub async fn run_ingest(
    pool: &PgPool,
    config: &AppConfig,
    job_id: i64,
    params: &IngestParams,
    cancel: &CancelFlag,
) -> Result<(), PipelineError> {
    painscope_db::start_job(pool, job_id).await?;

    let reddit_config = match RedditConfig::from_env() {
        Ok(c) => c,
        Err(msg) => {
            painscope_db::fail_job(pool, job_id, JobCounters::default(), &msg).await?;
            return Ok(());
        }
    };

    let client = match RedditClient::new(
        &reddit_config,
        config.request_timeout_secs,
        config.max_retries,
        config.retry_backoff_base_secs,
    )
    .await
    {
        Ok(client) => client,
        Err(e) => {
            // Authentication failure is fatal and non-retryable.
            painscope_db::fail_job(pool, job_id, JobCounters::default(), &e.to_string()).await?;
            return Ok(());
        }
    };

    let items = match client
        .fetch_listing(
            &params.community,
            params.sort_mode,
            &params.keywords,
            params.limit,
            params.time_window,
        )
        .await
    {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(job_id, community = %params.community, error = %e, "ingest fetch failed");
            painscope_db::fail_job(pool, job_id, JobCounters::default(), &e.to_string()).await?;
            return Ok(());
        }
    };

    let mut counters = JobCounters::default();
    let mut first_error: Option<String> = None;
    let mut inserted_post_ids: Vec<String> = Vec::new();

    for item in &items {
        if cancel.is_cancelled() {
            painscope_db::fail_job(pool, job_id, counters, CANCELLED_DETAIL).await?;
            return Ok(());
        }

        counters.items_seen += 1;
        match persist_item(pool, item).await? {
            RawItemInsert::Inserted(_) => inserted_post_ids.push(item.source_id.clone()),
            RawItemInsert::DuplicateSkipped => counters.items_skipped_duplicate += 1,
        }
    }

    if params.include_comments {
        ingest_comments(
            pool,
            &client,
            params,
            &inserted_post_ids,
            cancel,
            &mut counters,
            &mut first_error,
        )
        .await?;
        if cancel.is_cancelled() {
            painscope_db::fail_job(pool, job_id, counters, CANCELLED_DETAIL).await?;
            return Ok(());
        }
    }

    match first_error {
        Some(detail) => painscope_db::fail_job(pool, job_id, counters, &detail).await?,
        None => painscope_db::complete_job(pool, job_id, counters).await?,
    }

    tracing::info!(
        job_id,
        community = %params.community,
        seen = counters.items_seen,
        duplicates = counters.items_skipped_duplicate,
        "ingest run finished"
    );
    Ok(())
}

async fn ingest_comments(
    pool: &PgPool,
    client: &RedditClient,
    params: &IngestParams,
    post_ids: &[String],
    cancel: &CancelFlag,
    counters: &mut JobCounters,
    first_error: &mut Option<String>,
) -> Result<(), PipelineError> {
    for post_id in post_ids.iter().take(COMMENT_POST_CAP) {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let comments = match client
            .fetch_comments(post_id, params.comments_per_post, params.min_comment_score)
            .await
        {
            Ok(comments) => comments,
            Err(e @ (RedditError::RateLimited { .. } | RedditError::Http(_))) => {
                // One post's comment tree does not abort the run; the job
                // still terminates failed so the tick is auditable.
                tracing::warn!(post_id = %post_id, error = %e, "comment fetch failed");
                first_error.get_or_insert_with(|| e.to_string());
                continue;
            }
            Err(e) => {
                tracing::warn!(post_id = %post_id, error = %e, "comment fetch rejected");
                first_error.get_or_insert_with(|| e.to_string());
                continue;
            }
        };

        for comment in &comments {
            if cancel.is_cancelled() {
                return Ok(());
            }
            counters.items_seen += 1;
            match persist_item(pool, comment).await? {
                RawItemInsert::Inserted(_) => {}
                RawItemInsert::DuplicateSkipped => counters.items_skipped_duplicate += 1,
            }
        }
    }
    Ok(())
}

async fn persist_item(pool: &PgPool, item: &FetchedItem) -> Result<RawItemInsert, PipelineError> {
    let new_item = NewRawItem {
        source: item.source.as_str().to_owned(),
        source_id: item.source_id.clone(),
        content: item.content.clone(),
        author: item.author.clone(),
        community: item.community.clone(),
        url: item.url.clone(),
        upstream_score: item.upstream_score,
        scraped_at: item.posted_at.unwrap_or_else(Utc::now),
        source_metadata: item.metadata.clone(),
    };
    Ok(painscope_db::insert_raw_item(pool, &new_item).await?)
}
