//! Health Handler

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/health - liveness plus a database round trip
pub async fn health(State(state): State<ServerState>) -> AppResult<Json<Value>> {
    sqlx::query("SELECT 1").execute(state.pool()).await?;
    Ok(Json(json!({
        "status": "ok",
        "timestamp": shared::util::now_millis(),
    })))
}
