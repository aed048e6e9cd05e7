//! Bounty API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::bounties;
use crate::core::ServerState;
use crate::utils::AppResult;
use shared::models::{Bounty, BountyCreate};

#[derive(Deserialize)]
pub struct ClaimPayload {
    pub claimer_id: i64,
}

#[derive(Deserialize)]
pub struct CancelPayload {
    pub poster_id: i64,
}

/// GET /api/bounties - open bounties
pub async fn list_open(State(state): State<ServerState>) -> AppResult<Json<Vec<Bounty>>> {
    Ok(Json(bounties::list_open(state.pool()).await?))
}

/// GET /api/bounties/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Bounty>> {
    Ok(Json(bounties::get(state.pool(), id).await?))
}

/// POST /api/bounties
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<BountyCreate>,
) -> AppResult<Json<Bounty>> {
    Ok(Json(
        bounties::create(state.pool(), payload, state.config.max_session_credits).await?,
    ))
}

/// POST /api/bounties/:id/claim
pub async fn claim(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ClaimPayload>,
) -> AppResult<Json<Bounty>> {
    Ok(Json(
        bounties::claim(
            state.pool(),
            id,
            payload.claimer_id,
            state.config.min_claim_level,
        )
        .await?,
    ))
}

/// POST /api/bounties/:id/cancel - unclaimed bounties only
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<CancelPayload>,
) -> AppResult<Json<Bounty>> {
    Ok(Json(
        bounties::cancel(state.pool(), id, payload.poster_id).await?,
    ))
}
