//! Database operations for `pain_points`: idempotent writes keyed by
//! `raw_item_id`, filtered/paginated reads, and aggregate stats.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

const PAIN_POINT_COLUMNS: &str = "id, raw_item_id, problem_statement, category, severity, \
     opportunity_score, tags, context, created_at";

/// A row from the `pain_points` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PainPointRow {
    pub id: i64,
    pub raw_item_id: i64,
    pub problem_statement: String,
    pub category: String,
    pub severity: String,
    pub opportunity_score: i32,
    pub tags: Vec<String>,
    pub context: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPainPoint {
    pub raw_item_id: i64,
    pub problem_statement: String,
    pub category: String,
    pub severity: String,
    pub opportunity_score: i32,
    pub tags: Vec<String>,
    pub context: String,
}

/// Outcome of a pain-point write. A second attempt for the same raw item
/// returns the stored record unchanged.
#[derive(Debug)]
pub enum PainPointWrite {
    Created(PainPointRow),
    Existing(PainPointRow),
}

impl PainPointWrite {
    #[must_use]
    pub fn into_row(self) -> PainPointRow {
        match self {
            PainPointWrite::Created(row) | PainPointWrite::Existing(row) => row,
        }
    }
}

/// Filters for [`query_pain_points`]. All fields are optional and combine
/// conjunctively.
#[derive(Debug, Clone, Default)]
pub struct PainPointFilters {
    pub category: Option<String>,
    pub severity: Option<String>,
    pub min_opportunity_score: Option<i32>,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
pub struct PainPointPage {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SeverityCount {
    pub severity: String,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct PainPointStats {
    pub total: i64,
    pub by_category: Vec<CategoryCount>,
    pub by_severity: Vec<SeverityCount>,
}

/// Inserts a pain point unless one already exists for the raw item, in which
/// case the stored record is returned unchanged.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert or the fallback fetch fails.
pub async fn insert_pain_point(
    pool: &PgPool,
    point: &NewPainPoint,
) -> Result<PainPointWrite, DbError> {
    let inserted = sqlx::query_as::<_, PainPointRow>(&format!(
        "INSERT INTO pain_points \
             (raw_item_id, problem_statement, category, severity, opportunity_score, \
              tags, context) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (raw_item_id) DO NOTHING \
         RETURNING {PAIN_POINT_COLUMNS}"
    ))
    .bind(point.raw_item_id)
    .bind(&point.problem_statement)
    .bind(&point.category)
    .bind(&point.severity)
    .bind(point.opportunity_score)
    .bind(&point.tags)
    .bind(&point.context)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = inserted {
        return Ok(PainPointWrite::Created(row));
    }

    // Lost the conflict: the record already exists and is immutable.
    let existing = get_pain_point_by_raw_item(pool, point.raw_item_id)
        .await?
        .ok_or(DbError::NotFound)?;
    Ok(PainPointWrite::Existing(existing))
}

/// Fetches the pain point owned by a raw item, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_pain_point_by_raw_item(
    pool: &PgPool,
    raw_item_id: i64,
) -> Result<Option<PainPointRow>, DbError> {
    let row = sqlx::query_as::<_, PainPointRow>(&format!(
        "SELECT {PAIN_POINT_COLUMNS} FROM pain_points WHERE raw_item_id = $1"
    ))
    .bind(raw_item_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Filtered, paginated listing ordered by `created_at DESC` with `id` as a
/// stable tiebreak, so pagination stays deterministic under concurrent
/// inserts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn query_pain_points(
    pool: &PgPool,
    filters: &PainPointFilters,
    page: PainPointPage,
) -> Result<Vec<PainPointRow>, DbError> {
    let rows = sqlx::query_as::<_, PainPointRow>(&format!(
        "SELECT {PAIN_POINT_COLUMNS} \
         FROM pain_points \
         WHERE ($1::text IS NULL OR category = $1) \
           AND ($2::text IS NULL OR severity = $2) \
           AND ($3::int IS NULL OR opportunity_score >= $3) \
           AND ($4::timestamptz IS NULL OR created_at >= $4) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $5 OFFSET $6"
    ))
    .bind(&filters.category)
    .bind(&filters.severity)
    .bind(filters.min_opportunity_score)
    .bind(filters.since)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Aggregate counts by category and severity for summary reporting.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any of the queries fail.
pub async fn pain_point_stats(pool: &PgPool) -> Result<PainPointStats, DbError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pain_points")
        .fetch_one(pool)
        .await?;

    let by_category = sqlx::query_as::<_, CategoryCount>(
        "SELECT category, COUNT(*) AS count \
         FROM pain_points \
         GROUP BY category \
         ORDER BY count DESC, category ASC",
    )
    .fetch_all(pool)
    .await?;

    let by_severity = sqlx::query_as::<_, SeverityCount>(
        "SELECT severity, COUNT(*) AS count \
         FROM pain_points \
         GROUP BY severity \
         ORDER BY count DESC, severity ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(PainPointStats {
        total,
        by_category,
        by_severity,
    })
}
