//! Session API Handlers
//!
//! Actor ids ride in the request payloads; the identity layer in front of
//! this service is expected to have authenticated them.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::sessions;
use crate::utils::AppResult;
use shared::models::{DisputeResolution, LedgerEntry, SessionCreate, SkillSession};

#[derive(Deserialize)]
pub struct ActorPayload {
    pub actor_id: i64,
}

#[derive(Deserialize)]
pub struct SchedulePayload {
    pub actor_id: i64,
    pub scheduled_at: i64,
}

#[derive(Deserialize)]
pub struct CancelPayload {
    pub actor_id: i64,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct DisputePayload {
    pub actor_id: i64,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ResolvePayload {
    pub resolution: DisputeResolution,
    pub reason: Option<String>,
}

/// POST /api/sessions - create a session request against a catalog skill
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<SessionCreate>,
) -> AppResult<Json<SkillSession>> {
    let s = sessions::create_request(state.pool(), payload, state.config.max_session_credits)
        .await?;
    Ok(Json(s))
}

/// GET /api/sessions/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<SkillSession>> {
    Ok(Json(sessions::get(state.pool(), id).await?))
}

/// GET /api/sessions/:id/ledger - every ledger entry tied to this session
pub async fn session_ledger(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    Ok(Json(sessions::session_ledger(state.pool(), id).await?))
}

/// POST /api/sessions/:id/accept
pub async fn accept(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ActorPayload>,
) -> AppResult<Json<SkillSession>> {
    Ok(Json(
        sessions::accept(state.pool(), id, payload.actor_id).await?,
    ))
}

/// POST /api/sessions/:id/schedule
pub async fn schedule(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<SchedulePayload>,
) -> AppResult<Json<SkillSession>> {
    Ok(Json(
        sessions::schedule(state.pool(), id, payload.actor_id, payload.scheduled_at).await?,
    ))
}

/// POST /api/sessions/:id/start
pub async fn start(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ActorPayload>,
) -> AppResult<Json<SkillSession>> {
    Ok(Json(
        sessions::start(state.pool(), id, payload.actor_id).await?,
    ))
}

/// POST /api/sessions/:id/complete
pub async fn complete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ActorPayload>,
) -> AppResult<Json<SkillSession>> {
    let s = sessions::complete(state.pool(), id, payload.actor_id).await?;
    state.notifier.session_completed(&s);
    Ok(Json(s))
}

/// POST /api/sessions/:id/cancel
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<CancelPayload>,
) -> AppResult<Json<SkillSession>> {
    let s = sessions::cancel(state.pool(), id, payload.actor_id, payload.reason.as_deref())
        .await?;
    state.notifier.session_cancelled(&s);
    Ok(Json(s))
}

/// POST /api/sessions/:id/dispute
pub async fn dispute(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<DisputePayload>,
) -> AppResult<Json<SkillSession>> {
    Ok(Json(
        sessions::dispute(state.pool(), id, payload.actor_id, payload.reason.as_deref()).await?,
    ))
}

/// POST /api/sessions/:id/resolve - operator endpoint
pub async fn resolve(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ResolvePayload>,
) -> AppResult<Json<SkillSession>> {
    let s = sessions::resolve_dispute(
        state.pool(),
        id,
        payload.resolution,
        payload.reason.as_deref(),
    )
    .await?;
    match s.status {
        shared::models::SessionStatus::Completed => state.notifier.session_completed(&s),
        shared::models::SessionStatus::Cancelled => state.notifier.session_cancelled(&s),
        _ => {}
    }
    Ok(Json(s))
}
