//! Shared types for the SkillSwap credit marketplace
//!
//! Domain models used by both the server and any future clients. Database
//! derives (`sqlx::FromRow` / `sqlx::Type`) are gated behind the `db`
//! feature so client builds stay free of the sqlx dependency.

pub mod models;
pub mod util;

pub use models::{
    Balance, Bounty, BountyCreate, BountyStatus, ClassAttendance, ClassCreate, ClassStatus,
    DisputeResolution, LedgerEntry, LedgerEntryType, LiveClass, PaidStatus, Profile,
    ProfileCreate, SessionCreate, SessionOrigin, SessionStatus, Skill, SkillCreate, SkillSession,
    SkillStatus,
};
