//! Axum server and routes.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use social_types::{
    BaseResponse, CountsRequest, ErrorKind, FollowEdge, ListRequest, Page, RelationCounts,
    Relationship, SocialGraph, SocialGraphError, TargetRequest, UnfollowResponse, UserId,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Header carrying the authenticated caller, set by the fronting auth layer.
pub const CALLER_HEADER: &str = "x-user-id";

pub struct AppState {
    pub graph: Arc<dyn SocialGraph>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/social/follow", post(handle_follow))
        .route("/social/unfollow", post(handle_unfollow))
        .route("/social/followers", get(handle_followers))
        .route("/social/following", get(handle_following))
        .route("/social/friends", get(handle_friends))
        .route("/social/relationship", get(handle_relationship))
        .route("/social/counts", get(handle_counts))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Envelope code for an engine error.
pub fn status_code(err: &SocialGraphError) -> i32 {
    match err.kind() {
        ErrorKind::Validation => 400,
        ErrorKind::Absence => 404,
        ErrorKind::Conflict => 409,
        ErrorKind::Transient => 500,
    }
}

fn failure<T>(err: SocialGraphError) -> Json<BaseResponse<T>> {
    if err.is_transient() {
        tracing::warn!(error = %err, "request failed");
    }
    Json(BaseResponse::failure(
        status_code(&err),
        err.code(),
        err.to_string(),
    ))
}

fn respond<T>(res: Result<T, SocialGraphError>) -> Json<BaseResponse<T>> {
    match res {
        Ok(data) => Json(BaseResponse::ok(data)),
        Err(e) => failure(e),
    }
}

fn bad_request<T>(message: String) -> Json<BaseResponse<T>> {
    Json(BaseResponse::failure(400, "INVALID_REQUEST", message))
}

fn caller_from_headers(headers: &HeaderMap) -> Result<UserId, String> {
    let raw = headers
        .get(CALLER_HEADER)
        .ok_or_else(|| format!("missing {} header", CALLER_HEADER))?;
    raw.to_str()
        .ok()
        .and_then(|s| s.parse::<UserId>().ok())
        .ok_or_else(|| format!("invalid {} header", CALLER_HEADER))
}

fn unauthorized<T>(message: String) -> Json<BaseResponse<T>> {
    Json(BaseResponse::failure(401, "UNAUTHENTICATED", message))
}

/// Resolve the caller, or return the 401 envelope from the enclosing handler.
macro_rules! caller {
    ($headers:expr) => {
        match caller_from_headers(&$headers) {
            Ok(id) => id,
            Err(msg) => return unauthorized(msg),
        }
    };
}

/// Unwrap an extractor, or return the 400 envelope from the enclosing handler.
macro_rules! extracted {
    ($input:expr) => {
        match $input {
            Ok(v) => v.0,
            Err(rejection) => return bad_request(rejection.body_text()),
        }
    };
}

async fn handle_follow(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<TargetRequest>, JsonRejection>,
) -> Json<BaseResponse<FollowEdge>> {
    let caller = caller!(headers);
    let req = extracted!(body);
    respond(state.graph.follow(caller, req.target_id).await)
}

async fn handle_unfollow(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<TargetRequest>, JsonRejection>,
) -> Json<BaseResponse<UnfollowResponse>> {
    let caller = caller!(headers);
    let req = extracted!(body);
    respond(state.graph.unfollow(caller, req.target_id).await)
}

async fn handle_followers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<ListRequest>, QueryRejection>,
) -> Json<BaseResponse<Page<UserId>>> {
    let caller = caller!(headers);
    let req = extracted!(query);
    respond(state.graph.get_followers(caller, &req).await)
}

async fn handle_following(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<ListRequest>, QueryRejection>,
) -> Json<BaseResponse<Page<UserId>>> {
    let caller = caller!(headers);
    let req = extracted!(query);
    respond(state.graph.get_following(caller, &req).await)
}

async fn handle_friends(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<ListRequest>, QueryRejection>,
) -> Json<BaseResponse<Page<UserId>>> {
    let caller = caller!(headers);
    let req = extracted!(query);
    respond(state.graph.get_friends(caller, &req).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipQuery {
    #[serde(alias = "target_id")]
    pub target_id: UserId,
}

async fn handle_relationship(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<RelationshipQuery>, QueryRejection>,
) -> Json<BaseResponse<Relationship>> {
    let caller = caller!(headers);
    let q = extracted!(query);
    respond(state.graph.relationship(caller, q.target_id).await)
}

async fn handle_counts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<CountsRequest>, QueryRejection>,
) -> Json<BaseResponse<RelationCounts>> {
    let caller = caller!(headers);
    let q = extracted!(query);
    respond(state.graph.counts(caller, q.user_id).await)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

async fn handle_health() -> Json<BaseResponse<Health>> {
    Json(BaseResponse::ok(Health { status: "ok" }))
}
