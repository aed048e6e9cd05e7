//! Credit reservations
//!
//! A reservation is a `locked` ledger entry tied to a session. It reduces the
//! learner's available balance without touching total, so the credits cannot
//! be double-promised while the session is pending. Release appends an
//! `unlocked` entry pointing back at the lock; the lock row itself is never
//! touched.

use sqlx::SqliteConnection;

use crate::db::repository::{ledger, profile};
use crate::utils::error::{AppError, AppResult};
use shared::models::{LedgerEntry, LedgerEntryType};

/// Reserve `amount` credits of `user_id` against `session_id`.
///
/// Takes the user's balance lock first, then checks available balance under
/// that lock. Idempotent: if an outstanding lock for this session already
/// exists it is returned as-is (the partial unique index on
/// (session_id, entry_type) backstops this structurally).
pub async fn reserve_in_tx(
    conn: &mut SqliteConnection,
    user_id: i64,
    session_id: i64,
    amount: i64,
    description: &str,
) -> AppResult<LedgerEntry> {
    profile::acquire_balance_lock(&mut *conn, user_id).await?;

    if let Some(existing) = ledger::find_lock(&mut *conn, session_id).await? {
        return Ok(existing);
    }

    let bal = ledger::balance_in_tx(&mut *conn, user_id).await?;
    if bal.available < amount {
        return Err(AppError::InsufficientCredits(format!(
            "User {user_id} has {} available, needs {amount}",
            bal.available
        )));
    }

    let entry = ledger::append(
        &mut *conn,
        ledger::NewLedgerEntry {
            user_id,
            entry_type: LedgerEntryType::Locked,
            amount: -amount,
            session_id: Some(session_id),
            related_entry_id: None,
            description: description.to_string(),
        },
    )
    .await?;

    tracing::debug!(user_id, session_id, amount, "Credits reserved");
    Ok(entry)
}

/// Release the reservation held for `session_id` back to its owner.
///
/// Idempotent: an already-released lock returns the existing `unlocked`
/// entry. A lock that was spent instead is a Conflict; a session with no
/// lock at all is NotFound.
pub async fn release_in_tx(
    conn: &mut SqliteConnection,
    session_id: i64,
    description: &str,
) -> AppResult<LedgerEntry> {
    let lock = ledger::find_lock(&mut *conn, session_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No reservation found for session {session_id}"))
        })?;

    if let Some(resolver) = ledger::find_resolver(&mut *conn, lock.id).await? {
        return match resolver.entry_type {
            LedgerEntryType::Unlocked => Ok(resolver),
            _ => Err(AppError::Conflict(format!(
                "Reservation for session {session_id} was already spent"
            ))),
        };
    }

    profile::acquire_balance_lock(&mut *conn, lock.user_id).await?;

    let entry = ledger::append(
        &mut *conn,
        ledger::NewLedgerEntry {
            user_id: lock.user_id,
            entry_type: LedgerEntryType::Unlocked,
            amount: -lock.amount,
            session_id: Some(session_id),
            related_entry_id: Some(lock.id),
            description: description.to_string(),
        },
    )
    .await?;

    tracing::debug!(
        user_id = lock.user_id,
        session_id,
        amount = -lock.amount,
        "Reservation released"
    );
    Ok(entry)
}
