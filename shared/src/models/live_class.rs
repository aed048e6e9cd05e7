//! Live Class Models
//!
//! The one-to-many entry point: a host schedules a class, attendees book
//! seats. Every booking creates a per-attendee skill session, so class
//! completion is a fan-out of ordinary session completions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ClassStatus {
    Scheduled,
    Live,
    Completed,
    Cancelled,
}

/// Attendee payment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaidStatus {
    Reserved,
    Paid,
    Refunded,
    Cancelled,
}

/// Live class record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct LiveClass {
    pub id: i64,
    pub host_id: i64,
    pub title: String,
    /// Credits each attendee pays
    pub credit_cost: i64,
    pub status: ClassStatus,
    pub scheduled_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One attendee's seat in a class
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ClassAttendance {
    pub id: i64,
    pub class_id: i64,
    pub user_id: i64,
    /// Per-attendee session carrying the reservation
    pub session_id: i64,
    pub paid_status: PaidStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create class payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassCreate {
    pub host_id: i64,
    pub title: String,
    pub credit_cost: i64,
    pub scheduled_at: i64,
}
