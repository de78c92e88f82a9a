//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the three
//! pipeline cadences: a daily full ingest over the watchlist, an hourly
//! sentiment pass, and an hourly extraction pass offset to half past.
//! Scheduled triggers go through the same [`JobRegistry`] as API triggers,
//! so single-flight-per-type holds; a tick that finds its type still running
//! is skipped and logged, never queued.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use painscope_core::AppConfig;
use painscope_pipeline::{ExtractionParams, IngestParams, SentimentParams};

use crate::registry::{JobRegistry, TriggerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    config: Arc<AppConfig>,
    registry: Arc<JobRegistry>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_ingest_job(&scheduler, Arc::clone(&config), Arc::clone(&registry)).await?;
    register_sentiment_job(&scheduler, Arc::clone(&registry)).await?;
    register_extraction_job(&scheduler, registry).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the daily full-ingest job.
///
/// Runs at 02:00 UTC by default (`0 0 2 * * *`), overridable with
/// `PAINSCOPE_INGEST_CRON`. One job per watchlist community, sequentially —
/// awaiting each run keeps the single-flight invariant trivially true.
async fn register_ingest_job(
    scheduler: &JobScheduler,
    config: Arc<AppConfig>,
    registry: Arc<JobRegistry>,
) -> Result<(), JobSchedulerError> {
    let cron =
        std::env::var("PAINSCOPE_INGEST_CRON").unwrap_or_else(|_| "0 0 2 * * *".to_string());

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let config = Arc::clone(&config);
        let registry = Arc::clone(&registry);

        Box::pin(async move {
            tracing::info!("scheduler: starting daily ingest run");
            run_watchlist_ingest(&config, &registry).await;
            tracing::info!("scheduler: daily ingest run complete");
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered ingest job");
    Ok(())
}

/// Drive one ingest job per watchlist community, in order.
async fn run_watchlist_ingest(config: &AppConfig, registry: &JobRegistry) {
    let watchlist = match painscope_core::load_watchlist(&config.watchlist_path) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load watchlist");
            return;
        }
    };

    for community in &watchlist.communities {
        let params = IngestParams::for_community(
            &community.name,
            community.sort,
            watchlist.keywords_for(community),
            community.limit as usize,
        );

        match registry.trigger_ingest(params, "schedule").await {
            Ok(receipt) => {
                let job_id = receipt.job.public_id;
                if receipt.handle.await.is_err() {
                    tracing::error!(job = %job_id, "scheduler: ingest run panicked");
                }
            }
            Err(TriggerError::AlreadyRunning(job_type)) => {
                tracing::warn!(%job_type, "scheduler: skipping tick, previous run still in flight");
                return;
            }
            Err(e) => {
                tracing::error!(community = %community.name, error = %e, "scheduler: could not trigger ingest");
            }
        }
    }
}

/// Register the hourly sentiment pass (`0 0 * * * *`, overridable with
/// `PAINSCOPE_SENTIMENT_CRON`).
async fn register_sentiment_job(
    scheduler: &JobScheduler,
    registry: Arc<JobRegistry>,
) -> Result<(), JobSchedulerError> {
    let cron =
        std::env::var("PAINSCOPE_SENTIMENT_CRON").unwrap_or_else(|_| "0 0 * * * *".to_string());

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let registry = Arc::clone(&registry);

        Box::pin(async move {
            match registry
                .trigger_sentiment(SentimentParams::default(), "schedule")
                .await
            {
                Ok(receipt) => {
                    tracing::info!(job = %receipt.job.public_id, "scheduler: sentiment pass started");
                    let _ = receipt.handle.await;
                }
                Err(TriggerError::AlreadyRunning(job_type)) => {
                    tracing::warn!(%job_type, "scheduler: skipping tick, previous run still in flight");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: could not trigger sentiment pass");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered sentiment job");
    Ok(())
}

/// Register the hourly extraction pass offset to half past (`0 30 * * * *`,
/// overridable with `PAINSCOPE_EXTRACTION_CRON`).
async fn register_extraction_job(
    scheduler: &JobScheduler,
    registry: Arc<JobRegistry>,
) -> Result<(), JobSchedulerError> {
    let cron =
        std::env::var("PAINSCOPE_EXTRACTION_CRON").unwrap_or_else(|_| "0 30 * * * *".to_string());

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let registry = Arc::clone(&registry);

        Box::pin(async move {
            match registry
                .trigger_extraction(ExtractionParams::default(), "schedule")
                .await
            {
                Ok(receipt) => {
                    tracing::info!(job = %receipt.job.public_id, "scheduler: extraction pass started");
                    let _ = receipt.handle.await;
                }
                Err(TriggerError::AlreadyRunning(job_type)) => {
                    tracing::warn!(%job_type, "scheduler: skipping tick, previous run still in flight");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: could not trigger extraction pass");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered extraction job");
    Ok(())
}
