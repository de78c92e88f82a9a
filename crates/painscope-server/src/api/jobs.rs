use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use painscope_db::JobRow;
use painscope_pipeline::{ExtractionParams, IngestParams, SentimentParams};

use crate::middleware::RequestId;
use crate::registry::TriggerError;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct JobItem {
    pub job_id: Uuid,
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

impl From<JobRow> for JobItem {
    fn from(row: JobRow) -> Self {
        Self {
            job_id: row.public_id,
            job_type: row.job_type,
            trigger_source: row.trigger_source,
            parameters: row.parameters,
            status: row.status,
            items_seen: row.items_seen,
            items_skipped_duplicate: row.items_skipped_duplicate,
            items_failed: row.items_failed,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_detail: row.error_detail,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct TriggeredJob {
    pub job_id: Uuid,
}

fn map_trigger_error(request_id: String, error: TriggerError) -> ApiError {
    match error {
        TriggerError::AlreadyRunning(job_type) => ApiError::new(
            request_id,
            "conflict",
            format!("a {job_type} job is already running"),
        ),
        TriggerError::Db(e) => map_db_error(request_id, &e),
    }
}

pub(super) async fn trigger_ingest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(params): Json<IngestParams>,
) -> Result<impl IntoResponse, ApiError> {
    if params.community.trim().is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "community must be non-empty",
        ));
    }

    let receipt = state
        .registry
        .trigger_ingest(params, "api")
        .await
        .map_err(|e| map_trigger_error(req_id.0.clone(), e))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TriggeredJob {
                job_id: receipt.job.public_id,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn trigger_sentiment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(params): Json<SentimentParams>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state
        .registry
        .trigger_sentiment(params, "api")
        .await
        .map_err(|e| map_trigger_error(req_id.0.clone(), e))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TriggeredJob {
                job_id: receipt.job.public_id,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn trigger_extraction(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(params): Json<ExtractionParams>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state
        .registry
        .trigger_extraction(params, "api")
        .await
        .map_err(|e| map_trigger_error(req_id.0.clone(), e))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TriggeredJob {
                job_id: receipt.job.public_id,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn get_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobItem>>, ApiError> {
    let row = painscope_db::get_job_by_public_id(&state.pool, job_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: JobItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct JobsQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<ApiResponse<Vec<JobItem>>>, ApiError> {
    let rows = painscope_db::list_jobs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(JobItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
