//! Session Repository
//!
//! Row access for skill sessions. Status changes are single guarded UPDATEs
//! (`WHERE id = ? AND status IN (...)`) so a transition either claims the row
//! or affects nothing — the service layer classifies the nothing case.

use super::RepoResult;
use shared::models::{SessionOrigin, SessionStatus, SkillSession};
use sqlx::{SqliteConnection, SqlitePool};

const SESSION_SELECT: &str = "SELECT id, learner_id, teacher_id, skill_id, origin, status, credits_amount, credits_locked, scheduled_at, started_at, completed_at, cancelled_by, cancellation_reason, cancelled_at, disputed_by, dispute_reason, created_at, updated_at FROM skill_session";

/// Parameters for inserting a session row
#[derive(Debug, Clone)]
pub struct NewSession {
    pub learner_id: i64,
    pub teacher_id: i64,
    pub skill_id: Option<i64>,
    pub origin: SessionOrigin,
    pub status: SessionStatus,
    pub credits_amount: i64,
    pub scheduled_at: Option<i64>,
}

pub async fn insert(conn: &mut SqliteConnection, data: NewSession) -> RepoResult<i64> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO skill_session (id, learner_id, teacher_id, skill_id, origin, status, credits_amount, credits_locked, scheduled_at, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?9)",
    )
    .bind(id)
    .bind(data.learner_id)
    .bind(data.teacher_id)
    .bind(data.skill_id)
    .bind(data.origin)
    .bind(data.status)
    .bind(data.credits_amount)
    .bind(data.scheduled_at)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(id)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<SkillSession>> {
    let sql = format!("{SESSION_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, SkillSession>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id_in_tx(
    conn: &mut SqliteConnection,
    id: i64,
) -> RepoResult<Option<SkillSession>> {
    let sql = format!("{SESSION_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, SkillSession>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<SkillSession>> {
    let sql = format!(
        "{SESSION_SELECT} WHERE learner_id = ?1 OR teacher_id = ?1 ORDER BY created_at DESC"
    );
    let rows = sqlx::query_as::<_, SkillSession>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Claim the session row's write lock for the rest of the transaction.
///
/// A no-op write issued as the first statement of every transition so the
/// whole transition serializes on the row (SQLite promotes to the write lock
/// here, before any state is read). Returns false if the session is missing.
pub async fn lock_row(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE skill_session SET updated_at = updated_at WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(rows.rows_affected() == 1)
}

/// requested -> accepted
pub async fn mark_accepted(conn: &mut SqliteConnection, id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE skill_session SET status = 'accepted', updated_at = ?1 WHERE id = ?2 AND status = 'requested'",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// accepted -> scheduled
pub async fn mark_scheduled(
    conn: &mut SqliteConnection,
    id: i64,
    scheduled_at: i64,
) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE skill_session SET status = 'scheduled', scheduled_at = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'accepted'",
    )
    .bind(scheduled_at)
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// scheduled -> in_progress
pub async fn mark_started(conn: &mut SqliteConnection, id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE skill_session SET status = 'in_progress', started_at = ?1, updated_at = ?1 WHERE id = ?2 AND status = 'scheduled'",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// in_progress (or disputed, for resolution) -> completed; drops the hold flag
pub async fn mark_completed(
    conn: &mut SqliteConnection,
    id: i64,
    from: SessionStatus,
) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE skill_session SET status = 'completed', credits_locked = 0, completed_at = ?1, updated_at = ?1 WHERE id = ?2 AND status = ?3",
    )
    .bind(now)
    .bind(id)
    .bind(from)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// Any pre-completion status -> cancelled; drops the hold flag
pub async fn mark_cancelled(
    conn: &mut SqliteConnection,
    id: i64,
    cancelled_by: Option<i64>,
    reason: Option<&str>,
) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE skill_session SET status = 'cancelled', credits_locked = 0, cancelled_by = ?1, cancellation_reason = ?2, cancelled_at = ?3, updated_at = ?3 WHERE id = ?4 AND status IN ('requested', 'accepted', 'scheduled', 'in_progress', 'disputed')",
    )
    .bind(cancelled_by)
    .bind(reason)
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// in_progress -> disputed (reservation stays held pending resolution)
pub async fn mark_disputed(
    conn: &mut SqliteConnection,
    id: i64,
    raised_by: i64,
    reason: Option<&str>,
) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE skill_session SET status = 'disputed', disputed_by = ?1, dispute_reason = ?2, updated_at = ?3 WHERE id = ?4 AND status = 'in_progress'",
    )
    .bind(raised_by)
    .bind(reason)
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}
