//! Offline unit tests for painscope-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use painscope_core::{AppConfig, Environment};
use painscope_db::{JobCounters, JobRow, PainPointRow, PoolConfig, RawItemRow};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        watchlist_path: PathBuf::from("./config/watchlist.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        request_timeout_secs: 30,
        max_retries: 3,
        retry_backoff_base_secs: 5,
        reddit_user_agent: "ua".to_string(),
        sentiment_threshold: 0.5,
        sentiment_batch_limit: 100,
        extraction_batch_limit: 50,
        extract_max_concurrency: 4,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`JobRow`] has all expected fields
/// with the correct types. No database required.
#[test]
fn job_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = JobRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        job_type: "ingest".to_string(),
        trigger_source: "api".to_string(),
        parameters: serde_json::json!({"community": "saas"}),
        status: "pending".to_string(),
        items_seen: 0_i32,
        items_skipped_duplicate: 0_i32,
        items_failed: 0_i32,
        started_at: None,
        completed_at: None,
        error_detail: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.job_type, "ingest");
    assert_eq!(row.trigger_source, "api");
    assert_eq!(row.status, "pending");
    assert!(row.started_at.is_none());
    assert!(row.error_detail.is_none());
}

#[test]
fn job_counters_default_to_zero() {
    let counters = JobCounters::default();
    assert_eq!(counters.items_seen, 0);
    assert_eq!(counters.items_skipped_duplicate, 0);
    assert_eq!(counters.items_failed, 0);
}

#[test]
fn raw_item_row_has_expected_fields() {
    use chrono::Utc;

    let row = RawItemRow {
        id: 7,
        source: "reddit_post".to_string(),
        source_id: "abc123".to_string(),
        content: "I hate how slow this app is".to_string(),
        author: Some("someone".to_string()),
        community: Some("saas".to_string()),
        url: Some("https://reddit.com/r/saas/abc123".to_string()),
        upstream_score: 12,
        scraped_at: Utc::now(),
        source_metadata: serde_json::json!({"sort": "new"}),
        sentiment_checked: false,
        sentiment_label: None,
        sentiment_confidence: None,
        extraction_checked: false,
        created_at: Utc::now(),
    };

    assert_eq!(row.source, "reddit_post");
    assert!(!row.sentiment_checked);
    assert!(row.sentiment_label.is_none());
    assert!(!row.extraction_checked);
}

#[test]
fn pain_point_row_has_expected_fields() {
    use chrono::Utc;

    let row = PainPointRow {
        id: 3,
        raw_item_id: 7,
        problem_statement: "Report exports are too slow".to_string(),
        category: "performance".to_string(),
        severity: "high".to_string(),
        opportunity_score: 80,
        tags: vec!["performance".to_string(), "exports".to_string()],
        context: "crashes half the time".to_string(),
        created_at: Utc::now(),
    };

    assert_eq!(row.category, "performance");
    assert!(row.opportunity_score <= 100);
    assert!(row.tags.contains(&"performance".to_string()));
}
