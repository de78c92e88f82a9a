//! Database operations for `raw_items`.
//!
//! Dedup relies on the `(source, source_id)` uniqueness constraint rather
//! than application-level locking: a conflicting insert is a counted,
//! expected outcome.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

const RAW_ITEM_COLUMNS: &str = "id, source, source_id, content, author, community, url, \
     upstream_score, scraped_at, source_metadata, sentiment_checked, sentiment_label, \
     sentiment_confidence, extraction_checked, created_at";

/// A row from the `raw_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawItemRow {
    pub id: i64,
    pub source: String,
    pub source_id: String,
    pub content: String,
    pub author: Option<String>,
    pub community: Option<String>,
    pub url: Option<String>,
    pub upstream_score: i32,
    pub scraped_at: DateTime<Utc>,
    pub source_metadata: serde_json::Value,
    pub sentiment_checked: bool,
    pub sentiment_label: Option<String>,
    pub sentiment_confidence: Option<f64>,
    pub extraction_checked: bool,
    pub created_at: DateTime<Utc>,
}

/// A scraped unit ready for insertion.
#[derive(Debug, Clone)]
pub struct NewRawItem {
    pub source: String,
    pub source_id: String,
    pub content: String,
    pub author: Option<String>,
    pub community: Option<String>,
    pub url: Option<String>,
    pub upstream_score: i32,
    pub scraped_at: DateTime<Utc>,
    pub source_metadata: serde_json::Value,
}

/// Outcome of an insert attempt against the dedup key.
#[derive(Debug)]
pub enum RawItemInsert {
    Inserted(RawItemRow),
    DuplicateSkipped,
}

/// Inserts a raw item, skipping silently when `(source, source_id)` already
/// exists. The existing row is left untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any reason other than
/// the dedup conflict.
pub async fn insert_raw_item(pool: &PgPool, item: &NewRawItem) -> Result<RawItemInsert, DbError> {
    let row = sqlx::query_as::<_, RawItemRow>(&format!(
        "INSERT INTO raw_items \
             (source, source_id, content, author, community, url, upstream_score, \
              scraped_at, source_metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (source, source_id) DO NOTHING \
         RETURNING {RAW_ITEM_COLUMNS}"
    ))
    .bind(&item.source)
    .bind(&item.source_id)
    .bind(&item.content)
    .bind(&item.author)
    .bind(&item.community)
    .bind(&item.url)
    .bind(item.upstream_score)
    .bind(item.scraped_at)
    .bind(&item.source_metadata)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some(row) => RawItemInsert::Inserted(row),
        None => RawItemInsert::DuplicateSkipped,
    })
}

/// Returns a bounded batch of items the sentiment pass has not yet examined,
/// in scrape order so downstream behavior is deterministic.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unchecked_for_sentiment(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<RawItemRow>, DbError> {
    let rows = sqlx::query_as::<_, RawItemRow>(&format!(
        "SELECT {RAW_ITEM_COLUMNS} \
         FROM raw_items \
         WHERE sentiment_checked = FALSE \
         ORDER BY scraped_at ASC, id ASC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a bounded batch of gate-admitted items awaiting extraction:
/// classified negative at or above `threshold` and not yet extraction-checked.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_admitted_for_extraction(
    pool: &PgPool,
    threshold: f64,
    limit: i64,
) -> Result<Vec<RawItemRow>, DbError> {
    let rows = sqlx::query_as::<_, RawItemRow>(&format!(
        "SELECT {RAW_ITEM_COLUMNS} \
         FROM raw_items \
         WHERE sentiment_checked = TRUE \
           AND sentiment_label = 'negative' \
           AND sentiment_confidence >= $1 \
           AND extraction_checked = FALSE \
         ORDER BY scraped_at ASC, id ASC \
         LIMIT $2"
    ))
    .bind(threshold)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Records a classification result and marks the item sentiment-checked.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_sentiment_checked(
    pool: &PgPool,
    id: i64,
    label: &str,
    confidence: f64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE raw_items \
         SET sentiment_checked = TRUE, sentiment_label = $1, sentiment_confidence = $2 \
         WHERE id = $3",
    )
    .bind(label)
    .bind(confidence)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Marks the item as examined by the extraction pass.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_extraction_checked(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE raw_items SET extraction_checked = TRUE WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Total number of stored raw items.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_raw_items(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM raw_items")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
