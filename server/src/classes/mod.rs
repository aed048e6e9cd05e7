//! Live Class Service
//!
//! One-to-many entry point: a host schedules a class, attendees book seats.
//! A booking is a per-attendee `scheduled` session plus an attendance row,
//! so class start/complete/cancel is a fan-out of ordinary session
//! transitions. The class status change is its own transaction; each
//! attendee session is then processed in its own short transaction, so a
//! crash mid-fan-out leaves attendees still marked `reserved` and a re-run
//! resumes exactly where it stopped.

use sqlx::SqlitePool;

use crate::db::repository::{
    RepoError, live_class as class_repo, profile, session as session_repo,
};
use crate::db::repository::session::NewSession;
use crate::sessions;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation;
use shared::models::{
    ClassAttendance, ClassCreate, ClassStatus, LiveClass, PaidStatus, SessionOrigin, SessionStatus,
};

pub async fn get(pool: &SqlitePool, id: i64) -> AppResult<LiveClass> {
    class_repo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Class {id} not found")))
}

pub async fn list_upcoming(pool: &SqlitePool) -> AppResult<Vec<LiveClass>> {
    Ok(class_repo::list_upcoming(pool).await?)
}

pub async fn attendance(pool: &SqlitePool, class_id: i64) -> AppResult<Vec<ClassAttendance>> {
    get(pool, class_id).await?;
    Ok(class_repo::list_attendance(pool, class_id).await?)
}

pub async fn create(pool: &SqlitePool, data: ClassCreate, max_credits: i64) -> AppResult<LiveClass> {
    let title = validation::require_title(&data.title)?;
    validation::require_credit_amount(data.credit_cost, max_credits)?;
    profile::find_by_id(pool, data.host_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", data.host_id)))?;

    let class = class_repo::create(
        pool,
        ClassCreate {
            host_id: data.host_id,
            title,
            credit_cost: data.credit_cost,
            scheduled_at: data.scheduled_at,
        },
    )
    .await?;
    tracing::info!(
        class_id = class.id,
        host_id = class.host_id,
        cost = class.credit_cost,
        "Class scheduled"
    );
    Ok(class)
}

/// Book a seat: attendance row + per-attendee session + reservation, one
/// transaction. A duplicate booking returns the existing attendance.
pub async fn book(pool: &SqlitePool, class_id: i64, user_id: i64) -> AppResult<ClassAttendance> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    if !class_repo::lock_row(&mut tx, class_id).await? {
        return Err(AppError::NotFound(format!("Class {class_id} not found")));
    }
    let class = class_repo::find_by_id_in_tx(&mut tx, class_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Class {class_id} not found")))?;
    if class.status != ClassStatus::Scheduled {
        return Err(AppError::InvalidStateTransition(format!(
            "Class {class_id} is no longer open for booking"
        )));
    }
    validation::require_distinct_parties(user_id, class.host_id)?;

    // Class row lock held: the duplicate check and the insert cannot race
    // another booking for the same seat
    if let Some(existing) = class_repo::find_attendance_in_tx(&mut tx, class_id, user_id).await? {
        return Ok(existing);
    }

    let session = sessions::create_in_tx(
        &mut tx,
        NewSession {
            learner_id: user_id,
            teacher_id: class.host_id,
            skill_id: None,
            origin: SessionOrigin::Class,
            status: SessionStatus::Scheduled,
            credits_amount: class.credit_cost,
            scheduled_at: Some(class.scheduled_at),
        },
        &format!("Reserved for class: {}", class.title),
    )
    .await?;
    let attendance_id =
        class_repo::insert_attendance(&mut tx, class_id, user_id, session.id).await?;
    tx.commit().await.map_err(RepoError::from)?;

    tracing::info!(class_id, user_id, session_id = session.id, "Class booked");
    class_repo::find_attendance(pool, class_id, user_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Attendance {attendance_id} vanished")))
}

/// scheduled -> live, then start every attendee session
pub async fn start(pool: &SqlitePool, class_id: i64, host_id: i64) -> AppResult<LiveClass> {
    let class = transition_class(pool, class_id, host_id, ClassStatus::Live).await?;
    for att in class_repo::list_reserved_attendance(pool, class_id).await? {
        if let Err(e) = sessions::start(pool, att.session_id, host_id).await {
            tracing::warn!(
                class_id,
                session_id = att.session_id,
                error = %e,
                "Failed to start attendee session"
            );
        }
    }
    Ok(class)
}

/// live -> completed, then settle every still-reserved attendee.
///
/// Each settlement is its own short transaction; re-running after a crash
/// picks up the attendees still marked `reserved`.
pub async fn complete(pool: &SqlitePool, class_id: i64, host_id: i64) -> AppResult<LiveClass> {
    let class = transition_class(pool, class_id, host_id, ClassStatus::Completed).await?;
    for att in class_repo::list_reserved_attendance(pool, class_id).await? {
        if let Err(e) = sessions::complete(pool, att.session_id, host_id).await {
            tracing::warn!(
                class_id,
                session_id = att.session_id,
                error = %e,
                "Failed to settle attendee session"
            );
        }
    }
    Ok(class)
}

/// scheduled/live -> cancelled, then refund every still-reserved attendee
pub async fn cancel(
    pool: &SqlitePool,
    class_id: i64,
    host_id: i64,
    reason: Option<&str>,
) -> AppResult<LiveClass> {
    let class = transition_class(pool, class_id, host_id, ClassStatus::Cancelled).await?;
    for att in class_repo::list_reserved_attendance(pool, class_id).await? {
        if let Err(e) = refund_attendee(pool, &att, reason).await {
            tracing::warn!(
                class_id,
                session_id = att.session_id,
                error = %e,
                "Failed to refund attendee session"
            );
        }
    }
    Ok(class)
}

/// An attendee backs out before the class starts: their session is
/// cancelled, their seat marked `cancelled`, their reservation released.
pub async fn cancel_booking(
    pool: &SqlitePool,
    class_id: i64,
    user_id: i64,
) -> AppResult<ClassAttendance> {
    let class = get(pool, class_id).await?;
    if class.status != ClassStatus::Scheduled {
        return Err(AppError::InvalidStateTransition(format!(
            "Class {class_id} has already started"
        )));
    }
    let att = class_repo::find_attendance(pool, class_id, user_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No booking for user {user_id} in class {class_id}"))
        })?;
    if att.paid_status == PaidStatus::Cancelled {
        return Ok(att);
    }
    sessions::cancel(pool, att.session_id, user_id, Some("booking cancelled")).await?;
    class_repo::find_attendance(pool, class_id, user_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Attendance for session {} vanished", att.session_id)))
}

/// One guarded class status change in its own transaction. Already in the
/// target status is an idempotent success (so fan-outs can resume).
async fn transition_class(
    pool: &SqlitePool,
    class_id: i64,
    host_id: i64,
    target: ClassStatus,
) -> AppResult<LiveClass> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    if !class_repo::lock_row(&mut tx, class_id).await? {
        return Err(AppError::NotFound(format!("Class {class_id} not found")));
    }
    let class = class_repo::find_by_id_in_tx(&mut tx, class_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Class {class_id} not found")))?;
    if class.host_id != host_id {
        return Err(AppError::Forbidden(format!(
            "Only the host may manage class {class_id}"
        )));
    }
    if class.status == target {
        return Ok(class);
    }
    let rows = match target {
        ClassStatus::Live => class_repo::mark_live(&mut tx, class_id).await?,
        ClassStatus::Completed => class_repo::mark_completed(&mut tx, class_id).await?,
        ClassStatus::Cancelled => class_repo::mark_cancelled(&mut tx, class_id).await?,
        ClassStatus::Scheduled => 0,
    };
    if rows == 0 {
        return Err(AppError::InvalidStateTransition(format!(
            "Class {class_id} cannot move from '{:?}' here",
            class.status
        )));
    }
    tx.commit().await.map_err(RepoError::from)?;
    tracing::info!(class_id, ?target, "Class status changed");
    get(pool, class_id).await
}

/// System-cancel one attendee session during class cancellation
async fn refund_attendee(
    pool: &SqlitePool,
    att: &ClassAttendance,
    reason: Option<&str>,
) -> AppResult<()> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    if !session_repo::lock_row(&mut tx, att.session_id).await? {
        return Ok(());
    }
    let session = match session_repo::find_by_id_in_tx(&mut tx, att.session_id).await? {
        Some(s) => s,
        None => return Ok(()),
    };
    if session.status.is_terminal() {
        return Ok(());
    }
    sessions::cancel_in_tx(
        &mut tx,
        &session,
        None,
        reason.or(Some("class cancelled")),
        PaidStatus::Refunded,
    )
    .await?;
    tx.commit().await.map_err(RepoError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ledger;
    use crate::db::repository::profile::ensure;
    use crate::db::test_pool;
    use shared::models::ProfileCreate;

    const MAX_CREDITS: i64 = 100;

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

    async fn make_class(pool: &SqlitePool, host_id: i64, cost: i64) -> LiveClass {
        create(
            pool,
            ClassCreate {
                host_id,
                title: "Live soldering workshop".into(),
                credit_cost: cost,
                scheduled_at: shared::util::now_millis() + 86_400_000,
            },
            MAX_CREDITS,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_booking_reserves_and_creates_session() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10).await; // host
        seed_user(&pool, 2, 10).await;

        let class = make_class(&pool, 1, 4).await;
        let att = book(&pool, class.id, 2).await.unwrap();
        assert_eq!(att.paid_status, PaidStatus::Reserved);

        let session = sessions::get(&pool, att.session_id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Scheduled);
        assert_eq!(session.teacher_id, 1);

        let bal = ledger::get_balance(&pool, 2).await.unwrap();
        assert_eq!((bal.total, bal.reserved, bal.available), (10, 4, 6));
    }

    #[tokio::test]
    async fn test_duplicate_booking_idempotent() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10).await;
        seed_user(&pool, 2, 10).await;

        let class = make_class(&pool, 1, 4).await;
        let first = book(&pool, class.id, 2).await.unwrap();
        let second = book(&pool, class.id, 2).await.unwrap();
        assert_eq!(first.id, second.id);

        let bal = ledger::get_balance(&pool, 2).await.unwrap();
        assert_eq!(bal.reserved, 4); // one seat, one hold
    }

    #[tokio::test]
    async fn test_host_cannot_book_own_class() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10).await;

        let class = make_class(&pool, 1, 4).await;
        let err = book(&pool, class.id, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_complete_pays_host_per_attendee() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 0).await; // host
        seed_user(&pool, 2, 10).await;
        seed_user(&pool, 3, 10).await;

        let class = make_class(&pool, 1, 4).await;
        book(&pool, class.id, 2).await.unwrap();
        book(&pool, class.id, 3).await.unwrap();

        start(&pool, class.id, 1).await.unwrap();
        let done = complete(&pool, class.id, 1).await.unwrap();
        assert_eq!(done.status, ClassStatus::Completed);

        let host = ledger::get_balance(&pool, 1).await.unwrap();
        assert_eq!(host.total, 8); // 2 attendees x 4 credits

        for user in [2, 3] {
            let bal = ledger::get_balance(&pool, user).await.unwrap();
            assert_eq!((bal.total, bal.reserved, bal.available), (6, 0, 6));
            let att = class_repo::find_attendance(&pool, class.id, user)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(att.paid_status, PaidStatus::Paid);
        }
    }

    #[tokio::test]
    async fn test_complete_replay_resumes_without_double_pay() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 0).await;
        seed_user(&pool, 2, 10).await;

        let class = make_class(&pool, 1, 4).await;
        book(&pool, class.id, 2).await.unwrap();
        start(&pool, class.id, 1).await.unwrap();
        complete(&pool, class.id, 1).await.unwrap();
        complete(&pool, class.id, 1).await.unwrap();

        let host = ledger::get_balance(&pool, 1).await.unwrap();
        assert_eq!(host.total, 4); // paid once
    }

    #[tokio::test]
    async fn test_cancel_refunds_attendees() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 0).await;
        seed_user(&pool, 2, 10).await;

        let class = make_class(&pool, 1, 4).await;
        book(&pool, class.id, 2).await.unwrap();
        let cancelled = cancel(&pool, class.id, 1, Some("host sick")).await.unwrap();
        assert_eq!(cancelled.status, ClassStatus::Cancelled);

        let bal = ledger::get_balance(&pool, 2).await.unwrap();
        assert_eq!((bal.total, bal.reserved, bal.available), (10, 0, 10));
        let att = class_repo::find_attendance(&pool, class.id, 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(att.paid_status, PaidStatus::Refunded);
    }

    #[tokio::test]
    async fn test_cancel_booking_before_start() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 0).await;
        seed_user(&pool, 2, 10).await;

        let class = make_class(&pool, 1, 4).await;
        book(&pool, class.id, 2).await.unwrap();
        let att = cancel_booking(&pool, class.id, 2).await.unwrap();
        assert_eq!(att.paid_status, PaidStatus::Cancelled);

        let bal = ledger::get_balance(&pool, 2).await.unwrap();
        assert_eq!(bal.reserved, 0);

        // The class itself stays bookable for others
        let class = get(&pool, class.id).await.unwrap();
        assert_eq!(class.status, ClassStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_booking_closed_after_start() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 0).await;
        seed_user(&pool, 2, 10).await;
        seed_user(&pool, 3, 10).await;

        let class = make_class(&pool, 1, 4).await;
        book(&pool, class.id, 2).await.unwrap();
        start(&pool, class.id, 1).await.unwrap();

        let err = book(&pool, class.id, 3).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }
}
