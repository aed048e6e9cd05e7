//! Session State Machine
//!
//! One lifecycle for all three entry points (direct request, bounty claim,
//! class booking): requested -> accepted -> scheduled -> in_progress ->
//! completed | cancelled, with a disputed branch off in_progress resolved by
//! an operator.
//!
//! Every transition is one transaction. The first statement claims the
//! session row's write lock (`lock_row`), then the current status is read
//! and classified: the target status, or any status reachable only by
//! having already taken this transition, is an idempotent success (so a
//! retried network call never errors); any other mismatch is
//! `InvalidStateTransition`. The status change itself is a guarded UPDATE,
//! and its ledger effect (reserve, release, transfer) plus
//! bounty/attendance sync commit in the same transaction.

use sqlx::{SqliteConnection, SqlitePool};

use crate::credits;
use crate::db::repository::{
    RepoError, bounty as bounty_repo, ledger, live_class as class_repo, session as session_repo,
    skill as skill_repo,
};
use crate::db::repository::session::NewSession;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation;
use shared::models::{
    DisputeResolution, LedgerEntry, PaidStatus, SessionCreate, SessionOrigin, SessionStatus,
    SkillSession, SkillStatus,
};

fn invalid(op: &str, status: SessionStatus) -> AppError {
    AppError::InvalidStateTransition(format!(
        "Cannot {op} a session in status '{}'",
        status.as_str()
    ))
}

fn require_participant(session: &SkillSession, actor: i64) -> AppResult<()> {
    if actor != session.learner_id && actor != session.teacher_id {
        return Err(AppError::Forbidden(format!(
            "User {actor} is not a participant of session {}",
            session.id
        )));
    }
    Ok(())
}

fn require_teacher(session: &SkillSession, actor: i64) -> AppResult<()> {
    if actor != session.teacher_id {
        return Err(AppError::Forbidden(format!(
            "Only the teacher may accept session {}",
            session.id
        )));
    }
    Ok(())
}

/// Lock the session row and read its current state
async fn load_locked(conn: &mut SqliteConnection, id: i64) -> AppResult<SkillSession> {
    if !session_repo::lock_row(&mut *conn, id).await? {
        return Err(AppError::NotFound(format!("Session {id} not found")));
    }
    session_repo::find_by_id_in_tx(conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

async fn reload(pool: &SqlitePool, id: i64) -> AppResult<SkillSession> {
    session_repo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

pub async fn get(pool: &SqlitePool, id: i64) -> AppResult<SkillSession> {
    reload(pool, id).await
}

pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<SkillSession>> {
    Ok(session_repo::list_for_user(pool, user_id).await?)
}

pub async fn session_ledger(pool: &SqlitePool, id: i64) -> AppResult<Vec<LedgerEntry>> {
    reload(pool, id).await?;
    Ok(ledger::list_by_session(pool, id).await?)
}

/// Insert a session row and reserve the learner's credits, one transaction.
/// Shared by all three entry points.
pub(crate) async fn create_in_tx(
    conn: &mut SqliteConnection,
    data: NewSession,
    description: &str,
) -> AppResult<SkillSession> {
    let learner_id = data.learner_id;
    let amount = data.credits_amount;
    let id = session_repo::insert(&mut *conn, data).await?;
    credits::reserve_in_tx(&mut *conn, learner_id, id, amount, description).await?;
    session_repo::find_by_id_in_tx(conn, id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Session {id} vanished after insert")))
}

/// Create a direct session request against a catalog skill.
///
/// Reserves `credits_required` from the learner in the same transaction that
/// creates the `requested` session.
pub async fn create_request(
    pool: &SqlitePool,
    data: SessionCreate,
    max_credits: i64,
) -> AppResult<SkillSession> {
    let skill = skill_repo::find_by_id(pool, data.skill_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Skill {} not found", data.skill_id)))?;
    if skill.status != SkillStatus::Active {
        return Err(AppError::Validation(format!(
            "Skill {} is not active",
            skill.id
        )));
    }
    if skill.teacher_id != data.teacher_id {
        return Err(AppError::Validation(format!(
            "Skill {} is not offered by user {}",
            skill.id, data.teacher_id
        )));
    }
    validation::require_distinct_parties(data.learner_id, data.teacher_id)?;
    validation::require_credit_amount(skill.credits_required, max_credits)?;

    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    let session = create_in_tx(
        &mut tx,
        NewSession {
            learner_id: data.learner_id,
            teacher_id: data.teacher_id,
            skill_id: Some(skill.id),
            origin: SessionOrigin::Request,
            status: SessionStatus::Requested,
            credits_amount: skill.credits_required,
            scheduled_at: None,
        },
        &format!("Reserved for session request: {}", skill.title),
    )
    .await?;
    tx.commit().await.map_err(RepoError::from)?;

    tracing::info!(
        session_id = session.id,
        learner_id = session.learner_id,
        teacher_id = session.teacher_id,
        credits = session.credits_amount,
        "Session requested"
    );
    Ok(session)
}

/// requested -> accepted. Teacher only.
pub async fn accept(pool: &SqlitePool, id: i64, actor: i64) -> AppResult<SkillSession> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    let session = load_locked(&mut tx, id).await?;
    require_teacher(&session, actor)?;
    match session.status {
        // Every status past the requested -> accepted edge implies this
        // call already succeeded; cancelled does not (a request can be
        // cancelled without ever being accepted)
        SessionStatus::Accepted
        | SessionStatus::Scheduled
        | SessionStatus::InProgress
        | SessionStatus::Disputed
        | SessionStatus::Completed => return Ok(session),
        SessionStatus::Requested => {}
        other => return Err(invalid("accept", other)),
    }
    if session_repo::mark_accepted(&mut tx, id).await? == 0 {
        return Err(AppError::Conflict(format!(
            "Session {id} changed state concurrently"
        )));
    }
    tx.commit().await.map_err(RepoError::from)?;
    tracing::info!(session_id = id, "Session accepted");
    reload(pool, id).await
}

/// accepted -> scheduled. Either participant.
pub async fn schedule(
    pool: &SqlitePool,
    id: i64,
    actor: i64,
    scheduled_at: i64,
) -> AppResult<SkillSession> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    let session = load_locked(&mut tx, id).await?;
    require_participant(&session, actor)?;
    match session.status {
        SessionStatus::Scheduled
        | SessionStatus::InProgress
        | SessionStatus::Disputed
        | SessionStatus::Completed => return Ok(session),
        SessionStatus::Accepted => {}
        other => return Err(invalid("schedule", other)),
    }
    if session_repo::mark_scheduled(&mut tx, id, scheduled_at).await? == 0 {
        return Err(AppError::Conflict(format!(
            "Session {id} changed state concurrently"
        )));
    }
    tx.commit().await.map_err(RepoError::from)?;
    tracing::info!(session_id = id, scheduled_at, "Session scheduled");
    reload(pool, id).await
}

/// scheduled -> in_progress. Either participant.
pub async fn start(pool: &SqlitePool, id: i64, actor: i64) -> AppResult<SkillSession> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    let session = load_locked(&mut tx, id).await?;
    require_participant(&session, actor)?;
    match session.status {
        SessionStatus::InProgress
        | SessionStatus::Disputed
        | SessionStatus::Completed => return Ok(session),
        SessionStatus::Scheduled => {}
        other => return Err(invalid("start", other)),
    }
    if session_repo::mark_started(&mut tx, id).await? == 0 {
        return Err(AppError::Conflict(format!(
            "Session {id} changed state concurrently"
        )));
    }
    if session.origin == SessionOrigin::Bounty {
        bounty_repo::mark_in_progress(&mut tx, id).await?;
    }
    tx.commit().await.map_err(RepoError::from)?;
    tracing::info!(session_id = id, "Session started");
    reload(pool, id).await
}

/// Settle the session: guarded status UPDATE, transfer, origin sync.
/// Runs inside the caller's transaction, after the row lock is held.
pub(crate) async fn settle_in_tx(
    conn: &mut SqliteConnection,
    session: &SkillSession,
    description: &str,
) -> AppResult<()> {
    if session_repo::mark_completed(&mut *conn, session.id, session.status).await? == 0 {
        return Err(AppError::Conflict(format!(
            "Session {} changed state concurrently",
            session.id
        )));
    }
    credits::transfer_in_tx(&mut *conn, session.id, session.teacher_id, description).await?;
    match session.origin {
        SessionOrigin::Bounty => {
            bounty_repo::mark_completed(&mut *conn, session.id).await?;
        }
        SessionOrigin::Class => {
            class_repo::set_paid_status_for_session(&mut *conn, session.id, PaidStatus::Paid)
                .await?;
        }
        SessionOrigin::Request => {}
    }
    Ok(())
}

/// Cancel the session: guarded status UPDATE, release, origin sync.
/// Runs inside the caller's transaction, after the row lock is held.
pub(crate) async fn cancel_in_tx(
    conn: &mut SqliteConnection,
    session: &SkillSession,
    cancelled_by: Option<i64>,
    reason: Option<&str>,
    attendance_status: PaidStatus,
) -> AppResult<()> {
    if session_repo::mark_cancelled(&mut *conn, session.id, cancelled_by, reason).await? == 0 {
        return Err(AppError::Conflict(format!(
            "Session {} changed state concurrently",
            session.id
        )));
    }
    credits::release_in_tx(&mut *conn, session.id, "Reservation released on cancellation").await?;
    match session.origin {
        SessionOrigin::Bounty => {
            bounty_repo::mark_cancelled_for_session(&mut *conn, session.id).await?;
        }
        SessionOrigin::Class => {
            class_repo::set_paid_status_for_session(&mut *conn, session.id, attendance_status)
                .await?;
        }
        SessionOrigin::Request => {}
    }
    Ok(())
}

/// in_progress -> completed. Either participant. The reservation settles
/// into a spent/earned pair in the same transaction.
pub async fn complete(pool: &SqlitePool, id: i64, actor: i64) -> AppResult<SkillSession> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    let session = load_locked(&mut tx, id).await?;
    require_participant(&session, actor)?;
    match session.status {
        SessionStatus::Completed => return Ok(session),
        SessionStatus::InProgress => {}
        other => return Err(invalid("complete", other)),
    }
    settle_in_tx(&mut tx, &session, "Session completed").await?;
    tx.commit().await.map_err(RepoError::from)?;
    tracing::info!(
        session_id = id,
        learner_id = session.learner_id,
        teacher_id = session.teacher_id,
        credits = session.credits_amount,
        "Session completed"
    );
    reload(pool, id).await
}

/// Any pre-completion status -> cancelled. Either participant. The
/// reservation flows back to the learner in the same transaction.
pub async fn cancel(
    pool: &SqlitePool,
    id: i64,
    actor: i64,
    reason: Option<&str>,
) -> AppResult<SkillSession> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    let session = load_locked(&mut tx, id).await?;
    require_participant(&session, actor)?;
    match session.status {
        SessionStatus::Cancelled => return Ok(session),
        SessionStatus::Requested
        | SessionStatus::Accepted
        | SessionStatus::Scheduled
        | SessionStatus::InProgress => {}
        other => return Err(invalid("cancel", other)),
    }
    cancel_in_tx(&mut tx, &session, Some(actor), reason, PaidStatus::Cancelled).await?;
    tx.commit().await.map_err(RepoError::from)?;
    tracing::info!(session_id = id, cancelled_by = actor, "Session cancelled");
    reload(pool, id).await
}

/// in_progress -> disputed. Either participant. The reservation stays held
/// until an operator resolves.
pub async fn dispute(
    pool: &SqlitePool,
    id: i64,
    actor: i64,
    reason: Option<&str>,
) -> AppResult<SkillSession> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    let session = load_locked(&mut tx, id).await?;
    require_participant(&session, actor)?;
    match session.status {
        SessionStatus::Disputed => return Ok(session),
        SessionStatus::InProgress => {}
        other => return Err(invalid("dispute", other)),
    }
    if session_repo::mark_disputed(&mut tx, id, actor, reason).await? == 0 {
        return Err(AppError::Conflict(format!(
            "Session {id} changed state concurrently"
        )));
    }
    tx.commit().await.map_err(RepoError::from)?;
    tracing::warn!(session_id = id, raised_by = actor, "Session disputed");
    reload(pool, id).await
}

/// disputed -> completed (transfer) or cancelled (release). Operator action,
/// no participant check. Replaying the same resolution is an idempotent
/// success; replaying the opposite one is a Conflict.
pub async fn resolve_dispute(
    pool: &SqlitePool,
    id: i64,
    resolution: DisputeResolution,
    reason: Option<&str>,
) -> AppResult<SkillSession> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    let session = load_locked(&mut tx, id).await?;
    match (session.status, resolution) {
        (SessionStatus::Completed, DisputeResolution::Transfer) => return Ok(session),
        (SessionStatus::Cancelled, DisputeResolution::Release) => return Ok(session),
        (SessionStatus::Completed, DisputeResolution::Release)
        | (SessionStatus::Cancelled, DisputeResolution::Transfer) => {
            return Err(AppError::Conflict(format!(
                "Session {id} was already resolved the other way"
            )));
        }
        (SessionStatus::Disputed, _) => {}
        (other, _) => return Err(invalid("resolve", other)),
    }
    match resolution {
        DisputeResolution::Transfer => {
            settle_in_tx(&mut tx, &session, "Dispute resolved: transfer").await?;
        }
        DisputeResolution::Release => {
            cancel_in_tx(
                &mut tx,
                &session,
                None,
                reason.or(Some("dispute resolved: release")),
                PaidStatus::Refunded,
            )
            .await?;
        }
    }
    tx.commit().await.map_err(RepoError::from)?;
    tracing::info!(session_id = id, ?resolution, "Dispute resolved");
    reload(pool, id).await
}

/// System cancel for reservations that sat in `requested` past the timeout.
/// Returns false when someone else moved the session first.
pub async fn cancel_expired(pool: &SqlitePool, id: i64) -> AppResult<bool> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    if !session_repo::lock_row(&mut tx, id).await? {
        return Ok(false);
    }
    let session = match session_repo::find_by_id_in_tx(&mut tx, id).await? {
        Some(s) => s,
        None => return Ok(false),
    };
    if session.status != SessionStatus::Requested {
        return Ok(false);
    }
    cancel_in_tx(&mut tx, &session, None, Some("expired"), PaidStatus::Refunded).await?;
    tx.commit().await.map_err(RepoError::from)?;
    tracing::info!(session_id = id, "Expired reservation cancelled");
    Ok(true)
}
