//! Session API module

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/sessions", session_routes())
}

fn session_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/ledger", get(handler::session_ledger))
        .route("/{id}/accept", post(handler::accept))
        .route("/{id}/schedule", post(handler::schedule))
        .route("/{id}/start", post(handler::start))
        .route("/{id}/complete", post(handler::complete))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/dispute", post(handler::dispute))
        .route("/{id}/resolve", post(handler::resolve))
}
