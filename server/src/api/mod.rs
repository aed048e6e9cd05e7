//! API Route Modules
//!
//! # Structure
//!
//! - [`health`] - liveness check
//! - [`profiles`] - profile bootstrap, balance, ledger history
//! - [`skills`] - skill catalog
//! - [`sessions`] - session lifecycle transitions
//! - [`bounties`] - bounty post/claim/cancel
//! - [`classes`] - live class scheduling and booking
//! - [`admin`] - operational endpoints (manual sweep)

pub mod admin;
pub mod bounties;
pub mod classes;
pub mod health;
pub mod profiles;
pub mod sessions;
pub mod skills;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Assemble the full application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(profiles::router())
        .merge(skills::router())
        .merge(sessions::router())
        .merge(bounties::router())
        .merge(classes::router())
        .merge(admin::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
