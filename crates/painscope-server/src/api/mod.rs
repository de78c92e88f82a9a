mod communities;
mod jobs;
mod pain_points;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use painscope_core::AppConfig;

use crate::middleware::{request_id, RequestId};
use crate::registry::JobRegistry;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub registry: Arc<JobRegistry>,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &painscope_db::DbError) -> ApiError {
    if matches!(error, painscope_db::DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "record not found");
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/jobs/ingest", post(jobs::trigger_ingest))
        .route("/api/v1/jobs/sentiment", post(jobs::trigger_sentiment))
        .route("/api/v1/jobs/extraction", post(jobs::trigger_extraction))
        .route("/api/v1/jobs", get(jobs::list_jobs))
        .route("/api/v1/jobs/{job_id}", get(jobs::get_job))
        .route("/api/v1/pain-points", get(pain_points::list_pain_points))
        .route("/api/v1/pain-points/stats", get(pain_points::get_stats))
        .route(
            "/api/v1/communities/{community}",
            get(communities::get_community),
        )
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match painscope_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::jobs::JobItem;
    use super::pain_points::{PainPointItem, StatsData};
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_conflict_maps_to_409() {
        let response = ApiError::new("req-1", "conflict", "already running").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn api_error_upstream_maps_to_bad_gateway() {
        let response = ApiError::new("req-1", "upstream_error", "provider down").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn job_item_is_serializable() {
        // Proves the type compiles and serde works — no DB needed.
        let item = JobItem {
            job_id: Uuid::new_v4(),
            job_type: "extraction".to_string(),
            trigger_source: "api".to_string(),
            parameters: serde_json::json!({"limit": 50}),
            status: "succeeded".to_string(),
            items_seen: 12,
            items_skipped_duplicate: 0,
            items_failed: 1,
            started_at: Some(Utc::now()),
            completed_at: Some(Utc::now()),
            error_detail: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&item).expect("serialize job item");
        assert!(json.contains("\"job_type\":\"extraction\""));
        assert!(json.contains("\"items_seen\":12"));
    }

    #[test]
    fn pain_point_item_is_serializable() {
        let item = PainPointItem {
            id: 9,
            raw_item_id: 4,
            problem_statement: "Exports crash on large reports".to_string(),
            category: "performance".to_string(),
            severity: "high".to_string(),
            opportunity_score: 82,
            tags: vec!["performance".to_string()],
            context: "5+ minute exports".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&item).expect("serialize pain point");
        assert!(json.contains("\"category\":\"performance\""));
        assert!(json.contains("\"opportunity_score\":82"));
    }

    #[test]
    fn stats_data_is_serializable() {
        let data = StatsData {
            total: 3,
            by_category: vec![("performance".to_string(), 2), ("pricing".to_string(), 1)]
                .into_iter()
                .map(|(category, count)| super::pain_points::BucketCount { key: category, count })
                .collect(),
            by_severity: vec![super::pain_points::BucketCount {
                key: "high".to_string(),
                count: 3,
            }],
        };
        let json = serde_json::to_string(&data).expect("serialize stats");
        assert!(json.contains("\"total\":3"));
        assert!(json.contains("\"performance\""));
    }
}
