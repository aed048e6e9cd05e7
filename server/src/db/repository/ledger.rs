//! Ledger Repository (Ledger Store + Balance Calculator)
//!
//! The single source of truth for balances. Entries are append-only: a
//! `locked` entry is resolved by a later `spent` or `unlocked` entry whose
//! `related_entry_id` points back at it; no row is ever updated or deleted.
//!
//! Balance arithmetic:
//!   total     = SUM(amount) over settled types (earned/spent/refund/adjustment)
//!   reserved  = -SUM(amount) over outstanding locked entries
//!   available = total - reserved
//!
//! `balance_after` stored on each entry is the snapshot of `available`
//! immediately after that entry.

use super::{RepoError, RepoResult};
use shared::models::{Balance, LedgerEntry, LedgerEntryType};
use sqlx::{SqliteConnection, SqlitePool};

const ENTRY_SELECT: &str = "SELECT id, user_id, entry_type, amount, balance_after, session_id, related_entry_id, description, created_at FROM ledger_entry";

/// Subquery matching a resolver (spent or unlocked) of a locked entry
const RESOLVER_EXISTS: &str = "EXISTS (SELECT 1 FROM ledger_entry r WHERE r.related_entry_id = le.id AND r.entry_type IN ('spent', 'unlocked'))";

/// New entry to append. `balance_after` is computed at append time.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: i64,
    pub entry_type: LedgerEntryType,
    pub amount: i64,
    pub session_id: Option<i64>,
    pub related_entry_id: Option<i64>,
    pub description: String,
}

/// Append one immutable entry inside the caller's transaction.
///
/// Computes `balance_after` from the ledger as of this transaction and
/// rejects any entry that would drive the available balance negative. The
/// caller must already hold the user's balance lock
/// (`profile::acquire_balance_lock`).
pub async fn append(conn: &mut SqliteConnection, entry: NewLedgerEntry) -> RepoResult<LedgerEntry> {
    let bal = balance_in_tx(&mut *conn, entry.user_id).await?;

    let balance_after = match entry.entry_type {
        // A spent entry finalizes a hold: the amount leaves `total` at the
        // same moment the hold leaves `reserved`, so available is unchanged.
        LedgerEntryType::Spent if entry.related_entry_id.is_some() => bal.available,
        _ => bal.available + entry.amount,
    };

    if balance_after < 0 {
        return Err(RepoError::Validation(format!(
            "Entry would overdraw user {}: available {}, amount {}",
            entry.user_id, bal.available, entry.amount
        )));
    }

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO ledger_entry (id, user_id, entry_type, amount, balance_after, session_id, related_entry_id, description, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(id)
    .bind(entry.user_id)
    .bind(entry.entry_type.as_str())
    .bind(entry.amount)
    .bind(balance_after)
    .bind(entry.session_id)
    .bind(entry.related_entry_id)
    .bind(&entry.description)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    find_by_id_in_tx(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to append ledger entry".into()))
}

/// Balance within an open transaction (consistent snapshot)
pub async fn balance_in_tx(conn: &mut SqliteConnection, user_id: i64) -> RepoResult<Balance> {
    let sql = format!(
        "SELECT \
            COALESCE(SUM(CASE WHEN le.entry_type IN ('earned', 'spent', 'refund', 'adjustment') THEN le.amount ELSE 0 END), 0), \
            COALESCE(-SUM(CASE WHEN le.entry_type = 'locked' AND NOT {RESOLVER_EXISTS} THEN le.amount ELSE 0 END), 0) \
         FROM ledger_entry le WHERE le.user_id = ?"
    );
    let (total, reserved): (i64, i64) = sqlx::query_as(&sql)
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(Balance {
        total,
        reserved,
        available: total - reserved,
    })
}

/// Balance for a user, failing with NotFound if the profile was never
/// initialized. A single aggregate query gives a consistent snapshot.
pub async fn get_balance(pool: &SqlitePool, user_id: i64) -> RepoResult<Balance> {
    let mut tx = pool.begin().await?;
    let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM profile WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(RepoError::NotFound(format!(
            "No ledger initialized for user {user_id}"
        )));
    }
    let bal = balance_in_tx(&mut tx, user_id).await?;
    tx.commit().await?;
    Ok(bal)
}

pub async fn find_by_id_in_tx(
    conn: &mut SqliteConnection,
    id: i64,
) -> RepoResult<Option<LedgerEntry>> {
    let sql = format!("{ENTRY_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// The locked entry for a session, resolved or not
pub async fn find_lock(
    conn: &mut SqliteConnection,
    session_id: i64,
) -> RepoResult<Option<LedgerEntry>> {
    let sql = format!("{ENTRY_SELECT} WHERE session_id = ? AND entry_type = 'locked'");
    let row = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(session_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// The locked entry for a session that no terminal entry has resolved yet
pub async fn find_outstanding_lock(
    conn: &mut SqliteConnection,
    session_id: i64,
) -> RepoResult<Option<LedgerEntry>> {
    let sql = format!(
        "SELECT le.id, le.user_id, le.entry_type, le.amount, le.balance_after, le.session_id, le.related_entry_id, le.description, le.created_at \
         FROM ledger_entry le \
         WHERE le.session_id = ? AND le.entry_type = 'locked' AND NOT {RESOLVER_EXISTS}"
    );
    let row = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(session_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// The entry that resolved a locked entry (spent or unlocked), if any
pub async fn find_resolver(
    conn: &mut SqliteConnection,
    locked_id: i64,
) -> RepoResult<Option<LedgerEntry>> {
    let sql = format!(
        "{ENTRY_SELECT} WHERE related_entry_id = ? AND entry_type IN ('spent', 'unlocked')"
    );
    let row = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(locked_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn list_by_session(pool: &SqlitePool, session_id: i64) -> RepoResult<Vec<LedgerEntry>> {
    let sql = format!("{ENTRY_SELECT} WHERE session_id = ? ORDER BY created_at ASC, id ASC");
    let rows = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(session_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn list_by_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i32,
) -> RepoResult<Vec<LedgerEntry>> {
    let sql = format!("{ENTRY_SELECT} WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?");
    let rows = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Outstanding locks past the cutoff whose session never left `requested`.
/// The sweeper cancels these sessions to reclaim abandoned reservations.
pub async fn find_expired_locks(pool: &SqlitePool, cutoff: i64) -> RepoResult<Vec<LedgerEntry>> {
    let sql = format!(
        "SELECT le.id, le.user_id, le.entry_type, le.amount, le.balance_after, le.session_id, le.related_entry_id, le.description, le.created_at \
         FROM ledger_entry le \
         JOIN skill_session s ON s.id = le.session_id \
         WHERE le.entry_type = 'locked' AND le.created_at < ? \
           AND s.status = 'requested' AND NOT {RESOLVER_EXISTS} \
         ORDER BY le.created_at ASC"
    );
    let rows = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(cutoff)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
