//! Sentiment stage: classify not-yet-checked raw items and record the gate's
//! verdict per item.

use sqlx::PgPool;

use painscope_db::JobCounters;
use painscope_sentiment::{admits, ClassifierClient, SentimentError};

use crate::{CancelFlag, PipelineError, CANCELLED_DETAIL};

/// Runs one sentiment pass to termination.
///
/// Items are processed in scrape order. One item's classification failure
/// leaves its `sentiment_checked` flag false (so it is retried on the next
/// pass) and does not abort the batch; the job still ends `failed` with the
/// first transient error as detail so the run is auditable. An
/// authentication failure aborts the batch immediately.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] only when the job row or an item flag
/// cannot be written.
pub async fn run_sentiment_pass(
    pool: &PgPool,
    classifier: &ClassifierClient,
    threshold: f64,
    limit: i64,
    job_id: i64,
    cancel: &CancelFlag,
) -> Result<(), PipelineError> {
    painscope_db::start_job(pool, job_id).await?;

    let batch = painscope_db::list_unchecked_for_sentiment(pool, limit).await?;
    let mut counters = JobCounters::default();
    let mut first_error: Option<String> = None;
    let mut admitted = 0u32;

    for item in &batch {
        if cancel.is_cancelled() {
            painscope_db::fail_job(pool, job_id, counters, CANCELLED_DETAIL).await?;
            return Ok(());
        }

        counters.items_seen += 1;
        match classifier.classify(&item.content).await {
            Ok(classification) => {
                painscope_db::mark_sentiment_checked(
                    pool,
                    item.id,
                    classification.label.as_str(),
                    classification.confidence,
                )
                .await?;
                if admits(classification, threshold) {
                    admitted += 1;
                }
            }
            Err(e @ SentimentError::Auth(_)) => {
                // Invalid credentials fail every remaining item the same way.
                painscope_db::fail_job(pool, job_id, counters, &e.to_string()).await?;
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(item_id = item.id, error = %e, "classification failed; item stays unchecked");
                counters.items_failed += 1;
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    match first_error {
        Some(detail) => painscope_db::fail_job(pool, job_id, counters, &detail).await?,
        None => painscope_db::complete_job(pool, job_id, counters).await?,
    }

    tracing::info!(
        job_id,
        seen = counters.items_seen,
        failed = counters.items_failed,
        admitted,
        "sentiment pass finished"
    );
    Ok(())
}
