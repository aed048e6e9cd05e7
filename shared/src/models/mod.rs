//! Data models
//!
//! Shared between swap-server and API consumers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY, snowflake-generated).

pub mod bounty;
pub mod ledger;
pub mod live_class;
pub mod profile;
pub mod session;
pub mod skill;

pub use bounty::{Bounty, BountyCreate, BountyStatus};
pub use ledger::{Balance, LedgerEntry, LedgerEntryType};
pub use live_class::{ClassAttendance, ClassCreate, ClassStatus, LiveClass, PaidStatus};
pub use profile::{Profile, ProfileCreate};
pub use session::{DisputeResolution, SessionCreate, SessionOrigin, SessionStatus, SkillSession};
pub use skill::{Skill, SkillCreate, SkillStatus};
