//! Single-flight job orchestration.
//!
//! For each job type at most one run exists at a time within this process; a
//! trigger while one is running is rejected, never queued behind it. The
//! registry inserts the pending job row before spawning the run, so every
//! trigger returns a job id immediately and failure detail is always
//! retrievable through the jobs API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;
use tokio::task::JoinHandle;

use painscope_core::{AppConfig, JobType};
use painscope_db::{DbError, JobCounters, JobRow};
use painscope_extract::{ExtractorClient, ExtractorConfig};
use painscope_pipeline::{
    run_extraction_pass, run_ingest, run_sentiment_pass, CancelFlag, ExtractionParams,
    IngestParams, SentimentParams,
};
use painscope_sentiment::{ClassifierClient, ClassifierConfig};

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("a {0} job is already running")]
    AlreadyRunning(JobType),
    #[error(transparent)]
    Db(#[from] DbError),
}

/// A started run: the pending job row plus the handle driving it.
pub struct TriggerReceipt {
    pub job: JobRow,
    pub handle: JoinHandle<()>,
}

/// One `running` flag per job type.
#[derive(Default)]
pub(crate) struct RunningFlags {
    ingest: AtomicBool,
    sentiment: AtomicBool,
    extraction: AtomicBool,
}

impl RunningFlags {
    fn flag(&self, job_type: JobType) -> &AtomicBool {
        match job_type {
            JobType::Ingest => &self.ingest,
            JobType::Sentiment => &self.sentiment,
            JobType::Extraction => &self.extraction,
        }
    }

    /// Claims the flag for `job_type`, returning a guard that releases it on
    /// drop. `None` when a run of that type is already in flight.
    pub(crate) fn try_acquire(self: &Arc<Self>, job_type: JobType) -> Option<FlagGuard> {
        let claimed = self
            .flag(job_type)
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        claimed.then(|| FlagGuard {
            flags: Arc::clone(self),
            job_type,
        })
    }
}

/// Releases the per-type running flag when the run ends, however it ends.
pub(crate) struct FlagGuard {
    flags: Arc<RunningFlags>,
    job_type: JobType,
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.flags.flag(self.job_type).store(false, Ordering::SeqCst);
    }
}

pub struct JobRegistry {
    pool: PgPool,
    config: Arc<AppConfig>,
    flags: Arc<RunningFlags>,
    cancel: CancelFlag,
}

impl JobRegistry {
    #[must_use]
    pub fn new(pool: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            pool,
            config,
            flags: Arc::new(RunningFlags::default()),
            cancel: CancelFlag::new(),
        }
    }

    /// Signals every running job to stop after its current item.
    pub fn cancel_all(&self) {
        self.cancel.cancel();
    }

    /// Starts an ingest job, rejecting the trigger when one is running.
    ///
    /// # Errors
    ///
    /// [`TriggerError::AlreadyRunning`] when single-flight rejects, or
    /// [`TriggerError::Db`] if the job row cannot be created.
    pub async fn trigger_ingest(
        &self,
        params: IngestParams,
        trigger_source: &str,
    ) -> Result<TriggerReceipt, TriggerError> {
        let Some(guard) = self.flags.try_acquire(JobType::Ingest) else {
            return Err(TriggerError::AlreadyRunning(JobType::Ingest));
        };

        let parameters = serde_json::to_value(&params).unwrap_or_default();
        let job = painscope_db::create_job(
            &self.pool,
            JobType::Ingest.as_str(),
            trigger_source,
            &parameters,
        )
        .await?;

        let pool = self.pool.clone();
        let config = Arc::clone(&self.config);
        let cancel = self.cancel.clone();
        let job_id = job.id;
        let handle = tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = run_ingest(&pool, &config, job_id, &params, &cancel).await {
                tracing::error!(job_id, error = %e, "ingest run could not update its job row");
            }
        });

        Ok(TriggerReceipt { job, handle })
    }

    /// Starts a sentiment pass, rejecting the trigger when one is running.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`JobRegistry::trigger_ingest`].
    pub async fn trigger_sentiment(
        &self,
        params: SentimentParams,
        trigger_source: &str,
    ) -> Result<TriggerReceipt, TriggerError> {
        let Some(guard) = self.flags.try_acquire(JobType::Sentiment) else {
            return Err(TriggerError::AlreadyRunning(JobType::Sentiment));
        };

        let parameters = serde_json::to_value(params).unwrap_or_default();
        let job = painscope_db::create_job(
            &self.pool,
            JobType::Sentiment.as_str(),
            trigger_source,
            &parameters,
        )
        .await?;

        let pool = self.pool.clone();
        let config = Arc::clone(&self.config);
        let cancel = self.cancel.clone();
        let job_id = job.id;
        let handle = tokio::spawn(async move {
            let _guard = guard;
            let client = ClassifierConfig::from_env().and_then(|c| {
                ClassifierClient::new(&c, config.request_timeout_secs).map_err(|e| e.to_string())
            });
            let outcome = match client {
                Ok(classifier) => {
                    run_sentiment_pass(
                        &pool,
                        &classifier,
                        config.sentiment_threshold,
                        params.limit.unwrap_or(config.sentiment_batch_limit),
                        job_id,
                        &cancel,
                    )
                    .await
                }
                Err(msg) => fail_unstarted(&pool, job_id, &msg).await,
            };
            if let Err(e) = outcome {
                tracing::error!(job_id, error = %e, "sentiment run could not update its job row");
            }
        });

        Ok(TriggerReceipt { job, handle })
    }

    /// Starts an extraction pass, rejecting the trigger when one is running.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`JobRegistry::trigger_ingest`].
    pub async fn trigger_extraction(
        &self,
        params: ExtractionParams,
        trigger_source: &str,
    ) -> Result<TriggerReceipt, TriggerError> {
        let Some(guard) = self.flags.try_acquire(JobType::Extraction) else {
            return Err(TriggerError::AlreadyRunning(JobType::Extraction));
        };

        let parameters = serde_json::to_value(params).unwrap_or_default();
        let job = painscope_db::create_job(
            &self.pool,
            JobType::Extraction.as_str(),
            trigger_source,
            &parameters,
        )
        .await?;

        let pool = self.pool.clone();
        let config = Arc::clone(&self.config);
        let cancel = self.cancel.clone();
        let job_id = job.id;
        let handle = tokio::spawn(async move {
            let _guard = guard;
            let client = ExtractorConfig::from_env().and_then(|c| {
                ExtractorClient::new(&c, config.request_timeout_secs).map_err(|e| e.to_string())
            });
            let outcome = match client {
                Ok(extractor) => {
                    run_extraction_pass(
                        &pool,
                        &extractor,
                        config.sentiment_threshold,
                        params.limit.unwrap_or(config.extraction_batch_limit),
                        config.extract_max_concurrency,
                        job_id,
                        &cancel,
                    )
                    .await
                }
                Err(msg) => fail_unstarted(&pool, job_id, &msg).await,
            };
            if let Err(e) = outcome {
                tracing::error!(job_id, error = %e, "extraction run could not update its job row");
            }
        });

        Ok(TriggerReceipt { job, handle })
    }
}

/// Terminates a job that never reached its stage (missing credentials,
/// unbuildable client) so the audit trail is still written.
async fn fail_unstarted(
    pool: &PgPool,
    job_id: i64,
    detail: &str,
) -> Result<(), painscope_pipeline::PipelineError> {
    painscope_db::fail_job(pool, job_id, JobCounters::default(), detail).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_of_same_type_is_rejected() {
        let flags = Arc::new(RunningFlags::default());

        let first = flags.try_acquire(JobType::Extraction);
        assert!(first.is_some());

        let second = flags.try_acquire(JobType::Extraction);
        assert!(second.is_none(), "one running job per type");
    }

    #[test]
    fn different_types_run_in_parallel() {
        let flags = Arc::new(RunningFlags::default());

        let ingest = flags.try_acquire(JobType::Ingest);
        let sentiment = flags.try_acquire(JobType::Sentiment);
        let extraction = flags.try_acquire(JobType::Extraction);
        assert!(ingest.is_some() && sentiment.is_some() && extraction.is_some());
    }

    #[test]
    fn dropping_the_guard_releases_the_flag() {
        let flags = Arc::new(RunningFlags::default());

        let guard = flags.try_acquire(JobType::Ingest);
        drop(guard);
        assert!(
            flags.try_acquire(JobType::Ingest).is_some(),
            "a finished run frees its type"
        );
    }
}
