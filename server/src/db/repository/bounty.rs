//! Bounty Repository
//!
//! Claiming is the one contended operation: the guarded `mark_claimed`
//! UPDATE ensures exactly one claimer wins regardless of how many race.

use super::{RepoError, RepoResult};
use shared::models::{Bounty, BountyCreate};
use sqlx::{SqliteConnection, SqlitePool};

const BOUNTY_SELECT: &str = "SELECT id, poster_id, claimer_id, title, credits_offered, status, session_id, created_at, updated_at FROM bounty";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Bounty>> {
    let sql = format!("{BOUNTY_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Bounty>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id_in_tx(
    conn: &mut SqliteConnection,
    id: i64,
) -> RepoResult<Option<Bounty>> {
    let sql = format!("{BOUNTY_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Bounty>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn find_by_session_in_tx(
    conn: &mut SqliteConnection,
    session_id: i64,
) -> RepoResult<Option<Bounty>> {
    let sql = format!("{BOUNTY_SELECT} WHERE session_id = ?");
    let row = sqlx::query_as::<_, Bounty>(&sql)
        .bind(session_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn list_open(pool: &SqlitePool) -> RepoResult<Vec<Bounty>> {
    let sql = format!("{BOUNTY_SELECT} WHERE status = 'open' ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, Bounty>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, data: BountyCreate) -> RepoResult<Bounty> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO bounty (id, poster_id, title, credits_offered, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 'open', ?5, ?5)",
    )
    .bind(id)
    .bind(data.poster_id)
    .bind(&data.title)
    .bind(data.credits_offered)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create bounty".into()))
}

/// Claim the bounty row's write lock for the rest of the transaction
pub async fn lock_row(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE bounty SET updated_at = updated_at WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(rows.rows_affected() == 1)
}

/// open -> claimed, recording the winning claimer and their session
pub async fn mark_claimed(
    conn: &mut SqliteConnection,
    id: i64,
    claimer_id: i64,
    session_id: i64,
) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE bounty SET status = 'claimed', claimer_id = ?1, session_id = ?2, updated_at = ?3 WHERE id = ?4 AND status = 'open'",
    )
    .bind(claimer_id)
    .bind(session_id)
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// Follow the linked session into in_progress
pub async fn mark_in_progress(conn: &mut SqliteConnection, session_id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE bounty SET status = 'in_progress', updated_at = ?1 WHERE session_id = ?2 AND status = 'claimed'",
    )
    .bind(now)
    .bind(session_id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// Follow the linked session into completed
pub async fn mark_completed(conn: &mut SqliteConnection, session_id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE bounty SET status = 'completed', updated_at = ?1 WHERE session_id = ?2 AND status IN ('claimed', 'in_progress')",
    )
    .bind(now)
    .bind(session_id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// Linked session cancelled before completion: the bounty goes with it
pub async fn mark_cancelled_for_session(
    conn: &mut SqliteConnection,
    session_id: i64,
) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE bounty SET status = 'cancelled', updated_at = ?1 WHERE session_id = ?2 AND status IN ('claimed', 'in_progress')",
    )
    .bind(now)
    .bind(session_id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// open -> cancelled (unclaimed bounties only)
pub async fn mark_cancelled(conn: &mut SqliteConnection, id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE bounty SET status = 'cancelled', updated_at = ?1 WHERE id = ?2 AND status = 'open'",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}
