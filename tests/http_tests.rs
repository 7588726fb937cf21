//! HTTP API tests driven through the axum router

mod fixtures;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fixtures::test_roster;
use showdown::http::{router, ApiState};
use showdown::limiter::LimitConfig;
use showdown::store::{InMemoryEntityStore, InMemoryVoteStore};
use showdown::Arena;
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

fn create_test_app(max_votes: usize) -> Router {
    let entities = InMemoryEntityStore::with_entities(test_roster(3)).unwrap();
    let arena = Arena::builder(Arc::new(entities), Arc::new(InMemoryVoteStore::new()))
        .limits(LimitConfig {
            max_votes,
            ..LimitConfig::default()
        })
        .build();
    router(ApiState::new(Arc::new(arena), "showdown-test"))
}

async fn get(app: &Router, uri: &str, actor: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(actor) = actor {
        request = request.header("x-actor-id", actor);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or_default())
}

fn vote_request(winner: &str, loser: &str, actor: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/vote")
        .header("content-type", "application/json")
        .header("x-actor-id", actor)
        .body(Body::from(format!(
            r#"{{"winner_id":"{}","loser_id":"{}"}}"#,
            winner, loser
        )))
        .unwrap()
}

#[tokio::test]
async fn test_pair_vote_rankings_round_trip() {
    let app = create_test_app(15);

    let (status, pair) = get(&app, "/pair?category=female", None).await;
    assert_eq!(status, StatusCode::OK);
    let left = pair["left"]["id"].as_str().unwrap().to_string();
    let right = pair["right"]["id"].as_str().unwrap().to_string();
    assert_ne!(left, right);
    assert_eq!(pair["retained"], false);

    let response = app
        .clone()
        .oneshot(vote_request(&left, &right, "visitor-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, retained) =
        get(&app, &format!("/pair?category=female&retain={}", left), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(retained["retained"], true);

    let (status, rankings) = get(&app, "/rankings?category=female", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rankings[0]["id"], left.as_str());
    assert_eq!(rankings[0]["rating"], 1516);
    assert_eq!(rankings[2]["id"], right.as_str());

    let (status, history) = get(&app, &format!("/entities/{}/votes", left), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);

    println!("✅ HTTP round trip test passed");
}

#[tokio::test]
async fn test_rate_limit_returns_retry_after() {
    let app = create_test_app(2);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(vote_request("m1", "m2", "visitor-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(vote_request("m1", "m2", "visitor-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "43200");

    let (status, admission) = get(&app, "/admission", Some("visitor-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(admission["allowed"], false);
    assert_eq!(admission["retry_after_seconds"], 43200);

    let (_, admission) = get(&app, "/admission", Some("visitor-2")).await;
    assert_eq!(admission["allowed"], true);

    println!("✅ HTTP rate limit test passed");
}

#[tokio::test]
async fn test_admission_requires_actor() {
    let app = create_test_app(15);

    let (status, body) = get(&app, "/admission", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_actor");
}

#[tokio::test]
async fn test_cross_category_vote_rejected() {
    let app = create_test_app(15);

    let response = app
        .clone()
        .oneshot(vote_request("f1", "m1", "visitor-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, stats) = get(&app, "/stats", None).await;
    assert_eq!(stats["votes_in_ledger"], 0);
    assert_eq!(stats["votes_rejected"], 1);
}

#[tokio::test]
async fn test_categories_health_and_metrics() {
    let app = create_test_app(15);

    let (status, categories) = get(&app, "/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories, serde_json::json!(["female", "male"]));

    let (status, health) = get(&app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "showdown-test");

    app.clone()
        .oneshot(vote_request("f1", "f2", "visitor-1"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("showdown_votes_recorded_total 1"));
    assert!(text.contains("showdown_entities 6"));

    println!("✅ HTTP health and metrics test passed");
}
