//! Skill Catalog Model
//!
//! Projection of the external skill catalog: ownership, price and status are
//! what session creation validates against.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SkillStatus {
    Active,
    Inactive,
}

/// Catalog skill offered by a teacher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Skill {
    pub id: i64,
    pub teacher_id: i64,
    pub title: String,
    /// Credits a learner pays for one session of this skill
    pub credits_required: i64,
    pub status: SkillStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create skill payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCreate {
    pub teacher_id: i64,
    pub title: String,
    pub credits_required: i64,
}
