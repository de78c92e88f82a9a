//! Integration tests for `RedditClient` using wiremock HTTP mocks.

use painscope_core::{SortMode, Source, TimeWindow};
use painscope_reddit::{RedditClient, RedditConfig, RedditError};
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> RedditConfig {
    RedditConfig {
        client_id: "test-id".to_owned(),
        client_secret: "test-secret".to_owned(),
        user_agent: "painscope-test/0.1".to_owned(),
    }
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .and(basic_auth("test-id", "test-secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": "test-token"})),
        )
        .mount(server)
        .await;
}

async fn test_client(server: &MockServer) -> RedditClient {
    RedditClient::with_base_urls(&test_config(), 30, 0, 0, &server.uri(), &server.uri())
        .await
        .expect("client construction should not fail")
}

fn post_json(id: &str, title: &str, selftext: &str, score: i64) -> serde_json::Value {
    serde_json::json!({
        "kind": "t3",
        "data": {
            "id": id,
            "title": title,
            "selftext": selftext,
            "author": "someone",
            "permalink": format!("/r/saas/comments/{id}/"),
            "subreddit": "saas",
            "score": score,
            "num_comments": 4,
            "upvote_ratio": 0.93,
            "created_utc": 1_700_000_000.0
        }
    })
}

#[tokio::test]
async fn token_exchange_failure_is_fatal_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result =
        RedditClient::with_base_urls(&test_config(), 30, 3, 0, &server.uri(), &server.uri()).await;

    assert!(
        matches!(result, Err(RedditError::Auth(_))),
        "rejected credentials must surface as Auth"
    );
}

#[tokio::test]
async fn fetch_listing_applies_keyword_filter_in_provider_order() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    let body = serde_json::json!({
        "kind": "Listing",
        "data": {
            "children": [
                post_json("one", "I hate how slow this is", "", 12),
                post_json("two", "We just shipped a new feature", "all good here", 40),
                post_json("three", "So SLOW it hurts", "takes minutes to load", 3),
            ],
            "after": null
        }
    });

    Mock::given(method("GET"))
        .and(path("/r/saas/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let items = client
        .fetch_listing("saas", SortMode::New, &["slow".to_owned()], 10, None)
        .await
        .expect("fetch");

    let ids: Vec<&str> = items.iter().map(|i| i.source_id.as_str()).collect();
    assert_eq!(ids, vec!["one", "three"], "filtered, in provider order");
    assert_eq!(items[0].source, Source::RedditPost);
    assert_eq!(items[0].community.as_deref(), Some("saas"));
    assert_eq!(items[0].upstream_score, 12);
    assert_eq!(
        items[0].metadata["keyword_matched"],
        serde_json::json!("slow")
    );
    assert!(items[0].posted_at.is_some());
}

#[tokio::test]
async fn fetch_listing_without_keywords_uses_complaint_heuristic() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    let body = serde_json::json!({
        "kind": "Listing",
        "data": {
            "children": [
                post_json("keep", "the export feature is broken", "", 1),
                post_json("drop", "loving the new dashboard", "", 1),
            ],
            "after": null
        }
    });

    Mock::given(method("GET"))
        .and(path("/r/saas/hot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let items = client
        .fetch_listing("saas", SortMode::Hot, &[], 10, None)
        .await
        .expect("fetch");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source_id, "keep");
    assert!(items[0].metadata["keyword_matched"].is_null());
}

#[tokio::test]
async fn fetch_listing_passes_time_window_for_top_sort() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    let body = serde_json::json!({
        "kind": "Listing",
        "data": { "children": [post_json("w", "worst tool ever", "", 9)], "after": null }
    });

    Mock::given(method("GET"))
        .and(path("/r/saas/top"))
        .and(query_param("t", "week"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let items = client
        .fetch_listing("saas", SortMode::Top, &[], 10, Some(TimeWindow::Week))
        .await
        .expect("fetch");
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn unknown_community_is_not_found_not_rate_limited() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/doesnotexist/new"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let result = client
        .fetch_listing("doesnotexist", SortMode::New, &[], 10, None)
        .await;

    assert!(matches!(result, Err(RedditError::NotFound { .. })));
}

#[tokio::test]
async fn rate_limit_is_retried_then_succeeds() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    let body = serde_json::json!({
        "kind": "Listing",
        "data": { "children": [post_json("r", "this sucks", "", 2)], "after": null }
    });

    Mock::given(method("GET"))
        .and(path("/r/saas/new"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/saas/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client =
        RedditClient::with_base_urls(&test_config(), 30, 2, 0, &server.uri(), &server.uri())
            .await
            .expect("client");
    let items = client
        .fetch_listing("saas", SortMode::New, &[], 10, None)
        .await
        .expect("fetch should succeed after the retry");
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn rate_limit_exhaustion_surfaces_as_transient_error() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/saas/new"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let result = client.fetch_listing("saas", SortMode::New, &[], 10, None).await;

    assert!(matches!(result, Err(RedditError::RateLimited { .. })));
}

#[tokio::test]
async fn fetch_comments_retains_complaints_with_depth_metadata() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    let body = serde_json::json!([
        {
            "kind": "Listing",
            "data": { "children": [ { "kind": "t3", "data": { "id": "abc123", "title": "Anyone else annoyed?" } } ] }
        },
        {
            "kind": "Listing",
            "data": { "children": [
                {
                    "kind": "t1",
                    "data": {
                        "id": "c1",
                        "body": "this app is broken half the time",
                        "author": "op-user",
                        "permalink": "/r/saas/comments/abc123/c1/",
                        "subreddit": "saas",
                        "score": 5,
                        "is_submitter": true,
                        "created_utc": 1_700_000_100.0,
                        "replies": {
                            "kind": "Listing",
                            "data": { "children": [
                                {
                                    "kind": "t1",
                                    "data": {
                                        "id": "c2",
                                        "body": "same, the sync constantly fails for me",
                                        "author": "replier",
                                        "score": 2,
                                        "is_submitter": false,
                                        "replies": ""
                                    }
                                }
                            ] }
                        }
                    }
                },
                {
                    "kind": "t1",
                    "data": { "id": "c3", "body": "works fine for me", "score": 9, "replies": "" }
                },
                {
                    "kind": "t1",
                    "data": { "id": "c4", "body": "terrible support too", "score": 0, "replies": "" }
                }
            ] }
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/comments/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let comments = client.fetch_comments("abc123", 100, 1).await.expect("fetch");

    // c3 has no complaint; c4 is below the score floor.
    let ids: Vec<&str> = comments.iter().map(|c| c.source_id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2"]);

    assert_eq!(comments[0].source, Source::RedditComment);
    assert_eq!(comments[0].metadata["depth"], serde_json::json!(0));
    assert_eq!(comments[0].metadata["is_op"], serde_json::json!(true));
    assert_eq!(
        comments[0].metadata["parent_post_title"],
        serde_json::json!("Anyone else annoyed?")
    );
    assert_eq!(comments[1].metadata["depth"], serde_json::json!(1));
    assert_eq!(comments[1].metadata["is_op"], serde_json::json!(false));
}

#[tokio::test]
async fn fetch_community_metadata_degrades_flairs_and_rules_to_empty() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/saas/about"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "t5",
            "data": {
                "display_name": "saas",
                "title": "SaaS founders",
                "public_description": "all things saas",
                "subscribers": 120_000,
                "active_user_count": 431,
                "created_utc": 1_300_000_000.0,
                "over18": false
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/saas/api/link_flair"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/saas/about/rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rules": [
                { "short_name": "Be kind", "description": "no flaming", "kind": "comment" }
            ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let metadata = client.fetch_community_metadata("saas").await.expect("fetch");

    assert_eq!(metadata.name, "saas");
    assert_eq!(metadata.subscribers, 120_000);
    assert_eq!(metadata.active_users, 431);
    assert!(!metadata.nsfw);
    assert_eq!(metadata.url, "https://reddit.com/r/saas");
    assert!(metadata.flairs.is_empty(), "flair failure degrades to empty");
    assert_eq!(metadata.rules.len(), 1);
    assert_eq!(metadata.rules[0].short_name, "Be kind");
}

#[tokio::test]
async fn unknown_community_metadata_is_not_found() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/ghost/about"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let result = client.fetch_community_metadata("ghost").await;
    assert!(matches!(result, Err(RedditError::NotFound { .. })));
}
