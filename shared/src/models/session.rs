//! Skill Session Models
//!
//! A session is the unit of exchange: one learner, one teacher, a credit
//! amount reserved at creation and transferred on completion. All three
//! creation paths (direct request, bounty claim, live-class booking) produce
//! the same row and move through the same state machine.

use serde::{Deserialize, Serialize};

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Requested,
    Accepted,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Disputed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Requested => "requested",
            SessionStatus::Accepted => "accepted",
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Disputed => "disputed",
        }
    }

    /// Terminal states admit no further transitions (disputed sessions only
    /// move through the explicit resolution path)
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }
}

/// Which entry point created the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SessionOrigin {
    Request,
    Bounty,
    Class,
}

/// Skill session record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SkillSession {
    pub id: i64,
    pub learner_id: i64,
    pub teacher_id: i64,
    /// Catalog skill; absent for bounty and class sessions
    pub skill_id: Option<i64>,
    pub origin: SessionOrigin,
    pub status: SessionStatus,
    pub credits_amount: i64,
    /// Whether the learner's reservation is currently held
    pub credits_locked: bool,
    pub scheduled_at: Option<i64>,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    /// Who cancelled; None when the expiry sweeper did
    pub cancelled_by: Option<i64>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<i64>,
    pub disputed_by: Option<i64>,
    pub dispute_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create session request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreate {
    pub learner_id: i64,
    pub teacher_id: i64,
    pub skill_id: i64,
}

/// How an operator resolves a disputed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeResolution {
    /// Run the transfer as if the session completed normally
    Transfer,
    /// Release the reservation back to the learner
    Release,
}
