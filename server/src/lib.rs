//! Swap Server - peer-to-peer skill-exchange credit ledger
//!
//! # Architecture
//!
//! - **Ledger** (`db/repository/ledger`): append-only credit entries, the
//!   single source of truth for balances
//! - **Credits** (`credits`): reservation and transfer primitives, always
//!   inside the caller's transaction
//! - **Sessions** (`sessions`): one state machine for direct requests,
//!   bounty claims, and class bookings
//! - **Sweeper** (`sweeper`): reclaims reservations nobody accepted
//! - **HTTP API** (`api`): axum routers per area
//!
//! # Module structure
//!
//! ```text
//! server/src/
//! ├── core/       # config, state, server startup, background tasks
//! ├── db/         # SQLite pool, migrations, repositories
//! ├── credits/    # reservation manager, transfer engine
//! ├── sessions/   # session state machine
//! ├── bounties/   # bounty entry point
//! ├── classes/    # live-class entry point
//! ├── sweeper.rs  # reservation expiry sweeper
//! ├── services/   # notification webhook
//! ├── api/        # HTTP routes and handlers
//! └── utils/      # errors, logging, validation
//! ```

pub mod api;
pub mod bounties;
pub mod classes;
pub mod core;
pub mod credits;
pub mod db;
pub mod services;
pub mod sessions;
pub mod sweeper;
pub mod utils;

pub use crate::core::{Config, Server, ServerState};
pub use utils::{AppError, AppResult};
pub use utils::logger::{init_logger, init_logger_with_file};
