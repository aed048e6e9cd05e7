//! Credit transfer (settlement)
//!
//! Settles a session's reservation into an atomic spent/earned pair: the
//! learner's hold becomes a `spent` entry resolving the lock, and the teacher
//! gets a matching `earned` entry, in the same transaction.

use sqlx::SqliteConnection;

use crate::db::repository::{ledger, profile};
use crate::utils::error::{AppError, AppResult};
use shared::models::{LedgerEntry, LedgerEntryType};

/// What a transfer call observed
#[derive(Debug)]
pub enum TransferOutcome {
    /// This call performed the transfer
    Transferred {
        spent: LedgerEntry,
        earned: LedgerEntry,
    },
    /// A previous call already settled this session; nothing written
    AlreadyTransferred,
}

/// Settle the reservation for `session_id`, paying `teacher_id`.
///
/// Both balance locks are taken in user-id order so two concurrent transfers
/// touching the same pair cannot deadlock. Idempotent: a session already
/// settled returns [`TransferOutcome::AlreadyTransferred`]. A reservation
/// that was released instead is a Conflict.
pub async fn transfer_in_tx(
    conn: &mut SqliteConnection,
    session_id: i64,
    teacher_id: i64,
    description: &str,
) -> AppResult<TransferOutcome> {
    let lock = ledger::find_lock(&mut *conn, session_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No reservation found for session {session_id}"))
        })?;

    if let Some(resolver) = ledger::find_resolver(&mut *conn, lock.id).await? {
        return match resolver.entry_type {
            LedgerEntryType::Spent => Ok(TransferOutcome::AlreadyTransferred),
            _ => Err(AppError::Conflict(format!(
                "Reservation for session {session_id} was already released"
            ))),
        };
    }

    let amount = -lock.amount;
    let (first, second) = if lock.user_id < teacher_id {
        (lock.user_id, teacher_id)
    } else {
        (teacher_id, lock.user_id)
    };
    profile::acquire_balance_lock(&mut *conn, first).await?;
    profile::acquire_balance_lock(&mut *conn, second).await?;

    let spent = ledger::append(
        &mut *conn,
        ledger::NewLedgerEntry {
            user_id: lock.user_id,
            entry_type: LedgerEntryType::Spent,
            amount: -amount,
            session_id: Some(session_id),
            related_entry_id: Some(lock.id),
            description: description.to_string(),
        },
    )
    .await?;

    let earned = ledger::append(
        &mut *conn,
        ledger::NewLedgerEntry {
            user_id: teacher_id,
            entry_type: LedgerEntryType::Earned,
            amount,
            session_id: Some(session_id),
            related_entry_id: Some(spent.id),
            description: description.to_string(),
        },
    )
    .await?;

    tracing::info!(
        session_id,
        from = lock.user_id,
        to = teacher_id,
        amount,
        "Credits transferred"
    );
    Ok(TransferOutcome::Transferred { spent, earned })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credits::reservation::{release_in_tx, reserve_in_tx};
    use crate::db::repository::profile::ensure;
    use crate::db::repository::session::{self, NewSession};
    use crate::db::test_pool;
    use shared::models::{ProfileCreate, SessionOrigin, SessionStatus};
    use sqlx::SqlitePool;

    async fn seed_user(pool: &SqlitePool, user_id: i64, grant: i64) {
        ensure(
            pool,
            ProfileCreate {
                user_id,
                display_name: format!("user-{user_id}"),
                level: 1,
            },
            grant,
        )
        .await
        .unwrap();
    }

    async fn seed_session(pool: &SqlitePool, learner: i64, teacher: i64, credits: i64) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        session::insert(
            &mut conn,
            NewSession {
                learner_id: learner,
                teacher_id: teacher,
                skill_id: None,
                origin: SessionOrigin::Request,
                status: SessionStatus::InProgress,
                credits_amount: credits,
                scheduled_at: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_transfer_moves_credits() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10).await;
        seed_user(&pool, 2, 10).await;
        let sid = seed_session(&pool, 1, 2, 7).await;

        let mut tx = pool.begin().await.unwrap();
        reserve_in_tx(&mut tx, 1, sid, 7, "hold").await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let outcome = transfer_in_tx(&mut tx, sid, 2, "lesson").await.unwrap();
        tx.commit().await.unwrap();

        let TransferOutcome::Transferred { spent, earned } = outcome else {
            panic!("expected a fresh transfer");
        };
        assert_eq!(spent.amount, -7);
        assert_eq!(spent.balance_after, 3); // available unchanged by settlement
        assert_eq!(earned.amount, 7);
        assert_eq!(earned.balance_after, 17);

        let learner = ledger::get_balance(&pool, 1).await.unwrap();
        assert_eq!((learner.total, learner.reserved, learner.available), (3, 0, 3));
        let teacher = ledger::get_balance(&pool, 2).await.unwrap();
        assert_eq!((teacher.total, teacher.reserved, teacher.available), (17, 0, 17));
    }

    #[tokio::test]
    async fn test_transfer_idempotent() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10).await;
        seed_user(&pool, 2, 0).await;
        let sid = seed_session(&pool, 1, 2, 5).await;

        let mut tx = pool.begin().await.unwrap();
        reserve_in_tx(&mut tx, 1, sid, 5, "hold").await.unwrap();
        transfer_in_tx(&mut tx, sid, 2, "lesson").await.unwrap();
        let again = transfer_in_tx(&mut tx, sid, 2, "lesson").await.unwrap();
        tx.commit().await.unwrap();

        assert!(matches!(again, TransferOutcome::AlreadyTransferred));
        let teacher = ledger::get_balance(&pool, 2).await.unwrap();
        assert_eq!(teacher.total, 5); // paid once
    }

    #[tokio::test]
    async fn test_transfer_after_release_conflicts() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10).await;
        seed_user(&pool, 2, 0).await;
        let sid = seed_session(&pool, 1, 2, 5).await;

        let mut tx = pool.begin().await.unwrap();
        reserve_in_tx(&mut tx, 1, sid, 5, "hold").await.unwrap();
        release_in_tx(&mut tx, sid, "cancelled").await.unwrap();
        let err = transfer_in_tx(&mut tx, sid, 2, "lesson").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
