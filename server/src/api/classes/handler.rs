//! Live Class API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::classes;
use crate::core::ServerState;
use crate::utils::AppResult;
use shared::models::{ClassAttendance, ClassCreate, LiveClass};

#[derive(Deserialize)]
pub struct BookPayload {
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct HostPayload {
    pub host_id: i64,
}

#[derive(Deserialize)]
pub struct HostCancelPayload {
    pub host_id: i64,
    pub reason: Option<String>,
}

/// GET /api/classes - scheduled and live classes
pub async fn list_upcoming(State(state): State<ServerState>) -> AppResult<Json<Vec<LiveClass>>> {
    Ok(Json(classes::list_upcoming(state.pool()).await?))
}

/// GET /api/classes/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<LiveClass>> {
    Ok(Json(classes::get(state.pool(), id).await?))
}

/// GET /api/classes/:id/attendance
pub async fn attendance(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<ClassAttendance>>> {
    Ok(Json(classes::attendance(state.pool(), id).await?))
}

/// POST /api/classes
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ClassCreate>,
) -> AppResult<Json<LiveClass>> {
    Ok(Json(
        classes::create(state.pool(), payload, state.config.max_session_credits).await?,
    ))
}

/// POST /api/classes/:id/book
pub async fn book(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<BookPayload>,
) -> AppResult<Json<ClassAttendance>> {
    Ok(Json(classes::book(state.pool(), id, payload.user_id).await?))
}

/// POST /api/classes/:id/start
pub async fn start(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<HostPayload>,
) -> AppResult<Json<LiveClass>> {
    Ok(Json(
        classes::start(state.pool(), id, payload.host_id).await?,
    ))
}

/// POST /api/classes/:id/complete
pub async fn complete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<HostPayload>,
) -> AppResult<Json<LiveClass>> {
    Ok(Json(
        classes::complete(state.pool(), id, payload.host_id).await?,
    ))
}

/// POST /api/classes/:id/cancel
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<HostCancelPayload>,
) -> AppResult<Json<LiveClass>> {
    Ok(Json(
        classes::cancel(
            state.pool(),
            id,
            payload.host_id,
            payload.reason.as_deref(),
        )
        .await?,
    ))
}

/// POST /api/classes/:id/cancel-booking
pub async fn cancel_booking(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<BookPayload>,
) -> AppResult<Json<ClassAttendance>> {
    Ok(Json(
        classes::cancel_booking(state.pool(), id, payload.user_id).await?,
    ))
}
