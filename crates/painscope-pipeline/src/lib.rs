//! Pipeline stage runners.
//!
//! Each runner owns exactly one job row for its lifetime: it moves the job
//! from `pending` to `running`, processes a bounded batch with item-level
//! error isolation, and always terminates the job as `succeeded` or `failed`
//! — including on cancellation and on fatal client errors.

use thiserror::Error;

mod cancel;
mod extraction;
mod ingest;
mod params;
mod sentiment;

pub use cancel::CancelFlag;
pub use extraction::run_extraction_pass;
pub use ingest::run_ingest;
pub use params::{ExtractionParams, IngestParams, IngestSource, SentimentParams};
pub use sentiment::run_sentiment_pass;

/// Errors that escape a runner. Stage and item failures are recorded on the
/// job row instead; only failures of the audit trail itself propagate.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Db(#[from] painscope_db::DbError),
}

pub(crate) const CANCELLED_DETAIL: &str = "cancelled: shutdown requested before batch completion";
