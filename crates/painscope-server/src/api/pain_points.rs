use std::str::FromStr;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use painscope_core::{Category, Severity};
use painscope_db::{PainPointFilters, PainPointPage, PainPointRow};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct PainPointItem {
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

impl From<PainPointRow> for PainPointItem {
    fn from(row: PainPointRow) -> Self {
        Self {
            id: row.id,
            raw_item_id: row.raw_item_id,
            problem_statement: row.problem_statement,
            category: row.category,
            severity: row.severity,
            opportunity_score: row.opportunity_score,
            tags: row.tags,
            context: row.context,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PainPointsQuery {
    pub category: Option<String>,
    pub severity: Option<String>,
    pub min_opportunity_score: Option<i32>,
    pub since: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub(super) async fn list_pain_points(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PainPointsQuery>,
) -> Result<Json<ApiResponse<Vec<PainPointItem>>>, ApiError> {
    // Filters against closed enums are validated at the boundary so a typo
    // reads as a clear rejection instead of an empty result set.
    if let Some(category) = &query.category {
        if Category::from_str(category).is_err() {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                format!("unknown category: {category}"),
            ));
        }
    }
    if let Some(severity) = &query.severity {
        if Severity::from_str(severity).is_err() {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                format!("unknown severity: {severity}"),
            ));
        }
    }
    if let Some(score) = query.min_opportunity_score {
        if !(0..=100).contains(&score) {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                format!("min_opportunity_score must be within 0..=100, got {score}"),
            ));
        }
    }

    let per_page = normalize_limit(query.per_page);
    let page = query.page.unwrap_or(1).max(1);

    let filters = PainPointFilters {
        category: query.category,
        severity: query.severity,
        min_opportunity_score: query.min_opportunity_score,
        since: query.since,
    };
    let rows = painscope_db::query_pain_points(
        &state.pool,
        &filters,
        PainPointPage {
            limit: per_page,
            offset: (page - 1) * per_page,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(PainPointItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct BucketCount {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct StatsData {
    pub total: i64,
    pub by_category: Vec<BucketCount>,
    pub by_severity: Vec<BucketCount>,
}

pub(super) async fn get_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StatsData>>, ApiError> {
    let stats = painscope_db::pain_point_stats(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: StatsData {
            total: stats.total,
            by_category: stats
                .by_category
                .into_iter()
                .map(|c| BucketCount {
                    key: c.category,
                    count: c.count,
                })
                .collect(),
            by_severity: stats
                .by_severity
                .into_iter()
                .map(|s| BucketCount {
                    key: s.severity,
                    count: s.count,
                })
                .collect(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
