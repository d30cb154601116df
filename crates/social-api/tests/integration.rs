//! Integration tests: follow/unfollow, friendship derivation, pagination, error envelopes.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use social_api::server::{self, AppState};
use social_graph::InMemoryGraphStore;
use social_service::{InMemoryDirectory, PermissiveDirectory, SocialGraphService};
use social_types::{SocialGraph, UserId};
use std::sync::Arc;
use tower::util::ServiceExt;

fn test_app() -> axum::Router {
    let graph: Arc<dyn SocialGraph> = Arc::new(SocialGraphService::new(
        InMemoryGraphStore::new(),
        PermissiveDirectory,
    ));
    server::router(Arc::new(AppState { graph }))
}

async fn call(app: &axum::Router, req: Request<Body>) -> Value {
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn post(app: &axum::Router, uri: &str, caller: i64, body: Value) -> Value {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-user-id", caller.to_string())
        .body(Body::from(body.to_string()))
        .unwrap();
    call(app, req).await
}

async fn get(app: &axum::Router, uri: &str, caller: i64) -> Value {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-user-id", caller.to_string())
        .body(Body::empty())
        .unwrap();
    call(app, req).await
}

fn ids(page: &Value) -> Vec<i64> {
    page["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn follow_back_then_unfollow() {
    let app = test_app();

    let j = post(&app, "/social/follow", 10, json!({ "targetId": 20 })).await;
    assert_eq!(j["code"], 200);
    assert_eq!(j["data"]["followerId"], 10);
    assert_eq!(j["data"]["followingId"], 20);

    let j = get(&app, "/social/friends", 10).await;
    assert_eq!(ids(&j), Vec::<i64>::new());

    post(&app, "/social/follow", 20, json!({ "targetId": 10 })).await;
    let j = get(&app, "/social/friends", 10).await;
    assert_eq!(ids(&j), vec![20]);
    let j = get(&app, "/social/friends?userId=20", 10).await;
    assert_eq!(ids(&j), vec![10]);

    let j = get(&app, "/social/relationship?targetId=20", 10).await;
    assert_eq!(j["data"], json!({ "following": true, "followedBy": true, "friends": true }));

    let j = post(&app, "/social/unfollow", 10, json!({ "targetId": 20 })).await;
    assert_eq!(j["code"], 200);
    assert_eq!(j["data"]["success"], true);

    let j = get(&app, "/social/friends", 10).await;
    assert!(ids(&j).is_empty());
    let j = get(&app, "/social/following", 20).await;
    assert_eq!(ids(&j), vec![10]);
    let j = get(&app, "/social/counts?userId=20", 10).await;
    assert_eq!(j["data"], json!({ "followers": 0, "following": 1, "friends": 0 }));
}

#[tokio::test]
async fn followers_page_through_cursor() {
    let app = test_app();
    for follower in 1..=25 {
        let j = post(&app, "/social/follow", follower, json!({ "targetId": 1000 })).await;
        assert_eq!(j["code"], 200);
    }

    let first = get(&app, "/social/followers?limit=20", 1000).await;
    assert_eq!(first["code"], 200);
    assert_eq!(ids(&first).len(), 20);
    assert_eq!(first["data"]["hasMore"], true);
    let cursor = first["data"]["nextCursor"].as_str().unwrap().to_string();

    let uri = format!("/social/followers?userId=1000&limit=20&cursor={}", cursor);
    let second = get(&app, &uri, 1).await;
    assert_eq!(ids(&second).len(), 5);
    assert_eq!(second["data"]["hasMore"], false);
    assert!(second["data"].get("nextCursor").is_none());

    let mut all: Vec<i64> = ids(&first).into_iter().chain(ids(&second)).collect();
    all.sort_unstable();
    assert_eq!(all, (1..=25).collect::<Vec<_>>());
}

#[tokio::test]
async fn errors_map_to_envelope_codes() {
    let app = test_app();

    let j = post(&app, "/social/follow", 5, json!({ "targetId": 5 })).await;
    assert_eq!(j["code"], 400);
    assert_eq!(j["error"], "SELF_ACTION");

    post(&app, "/social/follow", 5, json!({ "targetId": 6 })).await;
    let j = post(&app, "/social/follow", 5, json!({ "targetId": 6 })).await;
    assert_eq!(j["code"], 409);
    assert_eq!(j["error"], "ALREADY_FOLLOWING");

    let j = post(&app, "/social/unfollow", 6, json!({ "targetId": 5 })).await;
    assert_eq!(j["code"], 404);
    assert_eq!(j["error"], "NOT_FOLLOWING");

    let j = get(&app, "/social/followers?cursor=not-a-cursor", 6).await;
    assert_eq!(j["code"], 400);
    assert_eq!(j["error"], "INVALID_CURSOR");

    let j = get(&app, "/social/followers?limit=0", 6).await;
    assert_eq!(j["code"], 400);
    assert_eq!(j["error"], "INVALID_LIMIT");

    let j = get(&app, "/social/followers?limit=abc", 6).await;
    assert_eq!(j["code"], 400);
    assert_eq!(j["error"], "INVALID_REQUEST");
}

#[tokio::test]
async fn snake_case_inputs_are_accepted() {
    let app = test_app();

    let j = post(&app, "/social/follow", 1, json!({ "target_id": 2 })).await;
    assert_eq!(j["code"], 200);
    let j = get(&app, "/social/followers?user_id=2", 1).await;
    assert_eq!(ids(&j), vec![1]);
    let j = get(&app, "/social/relationship?target_id=2", 1).await;
    assert_eq!(j["data"]["following"], true);
    let j = get(&app, "/social/counts?user_id=1", 2).await;
    assert_eq!(j["data"]["following"], 1);
}

#[tokio::test]
async fn unknown_target_is_404() {
    let graph: Arc<dyn SocialGraph> = Arc::new(SocialGraphService::new(
        InMemoryGraphStore::new(),
        InMemoryDirectory::with_users([UserId::new(1)]),
    ));
    let app = server::router(Arc::new(AppState { graph }));

    let j = post(&app, "/social/follow", 1, json!({ "targetId": 2 })).await;
    assert_eq!(j["code"], 404);
    assert_eq!(j["error"], "TARGET_NOT_FOUND");
}

#[tokio::test]
async fn caller_header_is_required() {
    let app = test_app();

    let req = Request::builder()
        .method("GET")
        .uri("/social/followers")
        .body(Body::empty())
        .unwrap();
    let j = call(&app, req).await;
    assert_eq!(j["code"], 401);

    let req = Request::builder()
        .method("POST")
        .uri("/social/follow")
        .header("content-type", "application/json")
        .header("x-user-id", "nobody")
        .body(Body::from(json!({ "targetId": 2 }).to_string()))
        .unwrap();
    let j = call(&app, req).await;
    assert_eq!(j["code"], 401);
}

#[tokio::test]
async fn health() {
    let app = test_app();
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let j = call(&app, req).await;
    assert_eq!(j["code"], 200);
    assert_eq!(j["data"]["status"], "ok");
}
