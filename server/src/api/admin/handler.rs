//! Admin API Handlers

use axum::{Json, extract::State};

use crate::core::ServerState;
use crate::sweeper::{self, SweepReport};
use crate::utils::AppResult;

/// POST /api/admin/sweep - run one expiry sweep pass now
pub async fn sweep(State(state): State<ServerState>) -> AppResult<Json<SweepReport>> {
    let report =
        sweeper::sweep_expired(state.pool(), state.config.reservation_timeout_ms()).await?;
    Ok(Json(report))
}
