//! Extraction stage: turn gate-admitted raw items into pain points under a
//! hard concurrency cap.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;

use futures::StreamExt;
use sqlx::PgPool;

use painscope_db::{JobCounters, NewPainPoint, RawItemRow};
use painscope_extract::{repair, ExtractError, ExtractorClient};

use crate::{CancelFlag, PipelineError, CANCELLED_DETAIL};

/// Shared accounting across concurrent item tasks.
#[derive(Default)]
struct PassState {
    items_seen: AtomicI32,
    items_failed: AtomicI32,
    /// First transient failure; the finished job is marked failed with it.
    transient_error: Mutex<Option<String>>,
    /// Fatal run-level failure (auth, broken store). Stops new items.
    run_error: Mutex<Option<String>>,
    fatal: AtomicBool,
}

impl PassState {
    fn record_transient(&self, detail: String) {
        self.items_failed.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.transient_error.lock().expect("poisoned");
        slot.get_or_insert(detail);
    }

    fn record_fatal(&self, detail: String) {
        self.fatal.store(true, Ordering::SeqCst);
        let mut slot = self.run_error.lock().expect("poisoned");
        slot.get_or_insert(detail);
    }

    fn counters(&self) -> JobCounters {
        JobCounters {
            items_seen: self.items_seen.load(Ordering::SeqCst),
            items_skipped_duplicate: 0,
            items_failed: self.items_failed.load(Ordering::SeqCst),
        }
    }
}

/// Runs one extraction pass to termination.
///
/// Model invocations run concurrently, bounded by `max_concurrency` — a hard
/// cap, not a hint. Per item the pass is idempotent: an existing pain point
/// short-circuits the model call and the stored record stands. Validation
/// failures skip the single item without failing the batch; transient
/// failures leave the item unchecked and mark the finished job failed;
/// authentication failures stop the run.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] only when the job row cannot be written.
pub async fn run_extraction_pass(
    pool: &PgPool,
    extractor: &ExtractorClient,
    threshold: f64,
    limit: i64,
    max_concurrency: usize,
    job_id: i64,
    cancel: &CancelFlag,
) -> Result<(), PipelineError> {
    painscope_db::start_job(pool, job_id).await?;

    let batch = painscope_db::list_admitted_for_extraction(pool, threshold, limit).await?;
    let state = PassState::default();

    futures::stream::iter(batch)
        .for_each_concurrent(max_concurrency.max(1), |item| {
            let state = &state;
            async move {
                if cancel.is_cancelled() || state.fatal.load(Ordering::SeqCst) {
                    return;
                }
                state.items_seen.fetch_add(1, Ordering::SeqCst);
                if let Err(e) = process_item(pool, extractor, &item, state).await {
                    // The store is the shared resource; if it fails, stop
                    // starting items rather than burn model spend blindly.
                    state.record_fatal(e.to_string());
                }
            }
        })
        .await;

    let counters = state.counters();
    let run_error = state.run_error.lock().expect("poisoned").take();
    let transient_error = state.transient_error.lock().expect("poisoned").take();

    if cancel.is_cancelled() {
        painscope_db::fail_job(pool, job_id, counters, CANCELLED_DETAIL).await?;
        return Ok(());
    }
    match run_error.or(transient_error) {
        Some(detail) => painscope_db::fail_job(pool, job_id, counters, &detail).await?,
        None => painscope_db::complete_job(pool, job_id, counters).await?,
    }

    tracing::info!(
        job_id,
        seen = counters.items_seen,
        failed = counters.items_failed,
        "extraction pass finished"
    );
    Ok(())
}

async fn process_item(
    pool: &PgPool,
    extractor: &ExtractorClient,
    item: &RawItemRow,
    state: &PassState,
) -> Result<(), painscope_db::DbError> {
    // Idempotence: an existing record makes this item a no-op.
    if let Some(existing) = painscope_db::get_pain_point_by_raw_item(pool, item.id).await? {
        tracing::debug!(item_id = item.id, pain_point_id = existing.id, "pain point already present");
        if !item.extraction_checked {
            painscope_db::mark_extraction_checked(pool, item.id).await?;
        }
        return Ok(());
    }

    let output = match extractor.extract(&item.content).await {
        Ok(output) => output,
        Err(e @ ExtractError::Auth(_)) => {
            state.record_fatal(e.to_string());
            return Ok(());
        }
        Err(e) if e.is_transient() => {
            tracing::warn!(item_id = item.id, error = %e, "extraction failed; item stays unchecked");
            state.record_transient(e.to_string());
            return Ok(());
        }
        Err(e) => {
            // Out-of-schema output: skip this item, leave it retryable.
            tracing::warn!(item_id = item.id, error = %e, "extraction output rejected");
            state.items_failed.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }
    };

    let Some(raw) = output else {
        // Explicit none-signal: the item is processed, no record is created.
        painscope_db::mark_extraction_checked(pool, item.id).await?;
        return Ok(());
    };

    let repaired = match repair(raw) {
        Ok(repaired) => repaired,
        Err(e) => {
            tracing::warn!(item_id = item.id, error = %e, "model output failed validation");
            state.items_failed.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }
    };

    let point = NewPainPoint {
        raw_item_id: item.id,
        problem_statement: repaired.problem_statement,
        category: repaired.category.as_str().to_owned(),
        severity: repaired.severity.as_str().to_owned(),
        opportunity_score: repaired.opportunity_score,
        tags: repaired.tags,
        context: repaired.context,
    };
    let written = painscope_db::insert_pain_point(pool, &point).await?;
    painscope_db::mark_extraction_checked(pool, item.id).await?;

    let row = written.into_row();
    tracing::debug!(
        item_id = item.id,
        pain_point_id = row.id,
        category = %row.category,
        severity = %row.severity,
        score = row.opportunity_score,
        "pain point stored"
    );
    Ok(())
}
