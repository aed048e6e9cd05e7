//! Profile Model
//!
//! Thin projection of the external identity service: just enough to anchor
//! the per-user ledger (the row-level lock target) and carry the level value
//! used as a bounty-claim gate. `lock_version` is bumped to take the user's
//! balance write lock inside a transaction.

use serde::{Deserialize, Serialize};

/// User profile / ledger anchor row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Profile {
    pub user_id: i64,
    pub display_name: String,
    /// Reputation level, fed by the external reputation service
    pub level: i64,
    /// Bumped on every balance-affecting write to serialize them
    pub lock_version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Ensure-profile payload. Idempotent: re-posting an existing user returns
/// the existing profile without a second initial grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileCreate {
    pub user_id: i64,
    pub display_name: String,
    /// Initial level; defaults to 1
    #[serde(default = "default_level")]
    pub level: i64,
}

fn default_level() -> i64 {
    1
}
