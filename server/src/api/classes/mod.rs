//! Live Class API module

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/classes", class_routes())
}

fn class_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list_upcoming).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/attendance", get(handler::attendance))
        .route("/{id}/book", post(handler::book))
        .route("/{id}/start", post(handler::start))
        .route("/{id}/complete", post(handler::complete))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/cancel-booking", post(handler::cancel_booking))
}
