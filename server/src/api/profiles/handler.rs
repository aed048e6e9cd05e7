//! Profile API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::repository::{ledger, profile};
use crate::sessions;
use crate::utils::{AppError, AppResult};
use shared::models::{Balance, LedgerEntry, Profile, ProfileCreate, SkillSession};

/// POST /api/profiles - ensure the profile exists, granting the initial
/// credits exactly once
pub async fn ensure(
    State(state): State<ServerState>,
    Json(payload): Json<ProfileCreate>,
) -> AppResult<Json<Profile>> {
    let p = profile::ensure(state.pool(), payload, state.config.initial_grant_credits).await?;
    Ok(Json(p))
}

/// GET /api/profiles/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Profile>> {
    let p = profile::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} not found")))?;
    Ok(Json(p))
}

/// GET /api/profiles/:id/balance
pub async fn balance(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Balance>> {
    let bal = ledger::get_balance(state.pool(), id).await?;
    Ok(Json(bal))
}

#[derive(Deserialize)]
pub struct LedgerQuery {
    #[serde(default = "default_limit")]
    limit: i32,
}

fn default_limit() -> i32 {
    50
}

/// GET /api/profiles/:id/ledger?limit=N - newest first
pub async fn ledger_history(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Query(q): Query<LedgerQuery>,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    profile::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} not found")))?;
    let entries = ledger::list_by_user(state.pool(), id, q.limit.clamp(1, 500)).await?;
    Ok(Json(entries))
}

/// GET /api/profiles/:id/sessions - sessions where the user is a participant
pub async fn sessions(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<SkillSession>>> {
    let list = sessions::list_for_user(state.pool(), id).await?;
    Ok(Json(list))
}
