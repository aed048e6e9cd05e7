//! Bounty Models
//!
//! The "pull" entry point: a poster offers credits to be taught something,
//! and a qualified claimer picks it up. Claiming creates a regular skill
//! session (learner = poster, teacher = claimer) through the shared state
//! machine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum BountyStatus {
    Open,
    Claimed,
    InProgress,
    Completed,
    Cancelled,
}

/// Learning bounty record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Bounty {
    pub id: i64,
    pub poster_id: i64,
    /// Set once claimed
    pub claimer_id: Option<i64>,
    pub title: String,
    pub credits_offered: i64,
    pub status: BountyStatus,
    /// The session created by the claim
    pub session_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create bounty payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BountyCreate {
    pub poster_id: i64,
    pub title: String,
    pub credits_offered: i64,
}
