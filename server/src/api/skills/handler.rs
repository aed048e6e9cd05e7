//! Skill API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::core::ServerState;
use crate::db::repository::{profile, skill};
use crate::utils::{AppError, AppResult, validation};
use shared::models::{Skill, SkillCreate};

/// GET /api/skills - active catalog
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Skill>>> {
    Ok(Json(skill::list_active(state.pool()).await?))
}

/// GET /api/skills/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Skill>> {
    let s = skill::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Skill {id} not found")))?;
    Ok(Json(s))
}

/// POST /api/skills
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<SkillCreate>,
) -> AppResult<Json<Skill>> {
    let title = validation::require_title(&payload.title)?;
    validation::require_credit_amount(payload.credits_required, state.config.max_session_credits)?;
    profile::find_by_id(state.pool(), payload.teacher_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Profile {} not found", payload.teacher_id))
        })?;
    let s = skill::create(
        state.pool(),
        SkillCreate {
            teacher_id: payload.teacher_id,
            title,
            credits_required: payload.credits_required,
        },
    )
    .await?;
    Ok(Json(s))
}

/// POST /api/skills/:id/deactivate
pub async fn deactivate(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Skill>> {
    if !skill::deactivate(state.pool(), id).await? {
        // Either missing or already inactive; disambiguate for the caller
        return match skill::find_by_id(state.pool(), id).await? {
            Some(s) => Ok(Json(s)),
            None => Err(AppError::NotFound(format!("Skill {id} not found"))),
        };
    }
    get_by_id(State(state), Path(id)).await
}
