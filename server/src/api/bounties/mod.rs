//! Bounty API module

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/bounties", bounty_routes())
}

fn bounty_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list_open).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/claim", post(handler::claim))
        .route("/{id}/cancel", post(handler::cancel))
}
