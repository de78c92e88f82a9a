//! Database operations for the `jobs` audit trail.
//!
//! Every ingestion or processing run writes exactly one row here, including
//! failure paths. Status transitions are guarded in SQL so a terminal job is
//! never resumed in place — a retry is a new job.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const JOB_COLUMNS: &str = "id, public_id, job_type, trigger_source, parameters, status, \
     items_seen, items_skipped_duplicate, items_failed, started_at, completed_at, \
     error_detail, created_at";

/// A row from the `jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub id: i64,
    pub public_id: Uuid,
    pub job_type: String,
    pub trigger_source: String,
    pub parameters: serde_json::Value,
    pub status: String,
    pub items_seen: i32,
    pub items_skipped_duplicate: i32,
    pub items_failed: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Final counters written when a run terminates.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobCounters {
    pub items_seen: i32,
    pub items_skipped_duplicate: i32,
    pub items_failed: i32,
}

/// Creates a new job in `pending` status with its recognized run parameters.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_job(
    pool: &PgPool,
    job_type: &str,
    trigger_source: &str,
    parameters: &serde_json::Value,
) -> Result<JobRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, JobRow>(&format!(
        "INSERT INTO jobs (public_id, job_type, trigger_source, parameters, status) \
         VALUES ($1, $2, $3, $4, 'pending') \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(public_id)
    .bind(job_type)
    .bind(trigger_source)
    .bind(parameters)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a job as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not `pending`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_job(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "pending",
        });
    }

    Ok(())
}

/// Marks a job as `succeeded` and records its final counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_job(pool: &PgPool, id: i64, counters: JobCounters) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'succeeded', completed_at = NOW(), \
             items_seen = $1, items_skipped_duplicate = $2, items_failed = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(counters.items_seen)
    .bind(counters.items_skipped_duplicate)
    .bind(counters.items_failed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a job as `failed`, recording counters and the error detail.
///
/// Accepts jobs in `pending` as well as `running` so a run that fails before
/// its first item (e.g. an authentication failure at client construction)
/// still terminates with a populated audit row.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is already terminal,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_job(
    pool: &PgPool,
    id: i64,
    counters: JobCounters,
    error_detail: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'failed', completed_at = NOW(), error_detail = $1, \
             items_seen = $2, items_skipped_duplicate = $3, items_failed = $4 \
         WHERE id = $5 AND status IN ('pending', 'running')",
    )
    .bind(error_detail)
    .bind(counters.items_seen)
    .bind(counters.items_skipped_duplicate)
    .bind(counters.items_failed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "pending or running",
        });
    }

    Ok(())
}

/// Fetches a single job by its public UUID.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_job_by_public_id(pool: &PgPool, public_id: Uuid) -> Result<JobRow, DbError> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` jobs, ordered by `created_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_jobs(pool: &PgPool, limit: i64) -> Result<Vec<JobRow>, DbError> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} \
         FROM jobs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
