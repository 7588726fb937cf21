//! Request handlers for the voting API

use crate::arena::Arena;
use crate::http::error::ApiError;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::types::{ActorId, EntityId, PairView, RankedEntity, Vote, VoteReceipt};
use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Header carrying the authenticated actor identity
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Shared state for all handlers
#[derive(Clone)]
pub struct ApiState {
    pub arena: Arc<Arena>,
    pub service_name: String,
    pub running: Arc<RwLock<bool>>,
}

impl ApiState {
    pub fn new(arena: Arc<Arena>, service_name: impl Into<String>) -> Self {
        Self {
            arena,
            service_name: service_name.into(),
            running: Arc::new(RwLock::new(true)),
        }
    }
}

/// Actor identity resolved from the request
///
/// Identity itself is established upstream; this only reads the result.
#[derive(Debug, Clone)]
pub struct Actor(pub ActorId);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|actor| !actor.is_empty())
            .map(|actor| Actor(actor.to_string()))
            .ok_or(ApiError::MissingActor)
    }
}

#[derive(Debug, Deserialize)]
pub struct PairQuery {
    pub category: String,
    pub retain: Option<EntityId>,
}

#[derive(Debug, Deserialize)]
pub struct RankingsQuery {
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub winner_id: EntityId,
    pub loser_id: EntityId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionView {
    pub allowed: bool,
    pub retry_after_seconds: Option<u64>,
}

pub async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "service": "showdown",
        "version": crate::VERSION,
        "endpoints": [
            "/pair",
            "/vote",
            "/rankings",
            "/admission",
            "/categories",
            "/entities/{id}/votes",
            "/stats",
            "/health",
            "/ready",
            "/metrics"
        ]
    }))
}

pub async fn pair_handler(
    State(state): State<ApiState>,
    Query(query): Query<PairQuery>,
) -> Result<Json<PairView>, ApiError> {
    let pair = state
        .arena
        .pair(&query.category, query.retain.as_deref())
        .await?;
    Ok(Json(pair))
}

pub async fn vote_handler(
    State(state): State<ApiState>,
    Actor(actor): Actor,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteReceipt>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;

    let receipt = state
        .arena
        .vote(&request.winner_id, &request.loser_id, &actor)
        .await?;
    Ok(Json(receipt))
}

pub async fn rankings_handler(
    State(state): State<ApiState>,
    Query(query): Query<RankingsQuery>,
) -> Result<Json<Vec<RankedEntity>>, ApiError> {
    let rankings = state.arena.rankings(query.category.as_deref()).await?;
    Ok(Json(rankings))
}

pub async fn admission_handler(
    State(state): State<ApiState>,
    Actor(actor): Actor,
) -> Json<AdmissionView> {
    let admission = state.arena.admission(&actor).await;
    Json(AdmissionView {
        allowed: admission.allowed,
        retry_after_seconds: admission.retry_after.map(|d| d.as_secs()),
    })
}

pub async fn categories_handler(
    State(state): State<ApiState>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.arena.categories().await?))
}

pub async fn history_handler(
    State(state): State<ApiState>,
    Path(entity_id): Path<EntityId>,
) -> Result<Json<Vec<Vote>>, ApiError> {
    Ok(Json(state.arena.history(&entity_id).await?))
}

pub async fn stats_handler(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let stats = state.arena.stats().await?;
    Ok(Json(stats).into_response())
}

pub async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    debug!("Health check requested");

    let running = *state.running.read().await;
    let health = HealthCheck::check(&state.arena, &state.service_name, running).await;
    let status = match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(health))
}

pub async fn ready_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let running = *state.running.read().await;
    match HealthCheck::readiness_check(&state.arena, running).await {
        HealthStatus::Healthy => (StatusCode::OK, "Ready"),
        HealthStatus::Degraded => (StatusCode::OK, "Degraded but ready"),
        HealthStatus::Unhealthy => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
    }
}

pub async fn metrics_handler(State(state): State<ApiState>) -> Response {
    // Refresh gauges before rendering
    if let Err(e) = state.arena.stats().await {
        debug!("Serving metrics with stale gauges: {}", e);
    }

    match state.arena.metrics().render() {
        Ok(text) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            ApiError::Internal("failed to encode metrics".to_string()).into_response()
        }
    }
}
