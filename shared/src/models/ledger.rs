//! Credit Ledger Models
//!
//! Every credit movement is one immutable, signed ledger entry. Balances are
//! never stored — they are always derived from the entry history, so there is
//! no mutable balance field to lose an update on.

use serde::{Deserialize, Serialize};

/// Kind of credit movement.
///
/// Sign convention: `spent` and `locked` carry negative amounts;
/// `earned`, `refund` and `unlocked` carry positive amounts;
/// `adjustment` may carry either sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    Earned,
    Spent,
    Refund,
    Adjustment,
    Locked,
    Unlocked,
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryType::Earned => "earned",
            LedgerEntryType::Spent => "spent",
            LedgerEntryType::Refund => "refund",
            LedgerEntryType::Adjustment => "adjustment",
            LedgerEntryType::Locked => "locked",
            LedgerEntryType::Unlocked => "unlocked",
        }
    }
}

/// One immutable credit movement.
///
/// Rows are append-only: a `locked` entry is *resolved* when a later `spent`
/// or `unlocked` entry points back at it through `related_entry_id`. The row
/// itself is never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub entry_type: LedgerEntryType,
    /// Signed credit amount (see [`LedgerEntryType`] for the sign convention)
    pub amount: i64,
    /// Snapshot of the user's available balance immediately after this entry
    pub balance_after: i64,
    /// Session this movement belongs to, if any
    pub session_id: Option<i64>,
    /// Links paired entries: a resolver to its `locked` entry, and a
    /// teacher-side `earned` to the learner-side `spent`
    pub related_entry_id: Option<i64>,
    pub description: String,
    pub created_at: i64,
}

/// Derived balance for one user. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Sum of all settled entries (earned, spent, refund, adjustment)
    pub total: i64,
    /// Credits held by outstanding reservations
    pub reserved: i64,
    /// `total - reserved`; never negative
    pub available: i64,
}
