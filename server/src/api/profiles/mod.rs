//! Profile API module

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/profiles", profile_routes())
}

fn profile_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::ensure))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/balance", get(handler::balance))
        .route("/{id}/ledger", get(handler::ledger_history))
        .route("/{id}/sessions", get(handler::sessions))
}
