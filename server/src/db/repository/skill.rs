//! Skill Repository

use super::{RepoError, RepoResult};
use shared::models::{Skill, SkillCreate};
use sqlx::SqlitePool;

const SKILL_SELECT: &str =
    "SELECT id, teacher_id, title, credits_required, status, created_at, updated_at FROM skill";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Skill>> {
    let sql = format!("{SKILL_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Skill>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn list_active(pool: &SqlitePool) -> RepoResult<Vec<Skill>> {
    let sql = format!("{SKILL_SELECT} WHERE status = 'active' ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, Skill>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, data: SkillCreate) -> RepoResult<Skill> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO skill (id, teacher_id, title, credits_required, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 'active', ?5, ?5)",
    )
    .bind(id)
    .bind(data.teacher_id)
    .bind(&data.title)
    .bind(data.credits_required)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create skill".into()))
}

/// Deactivate a skill so new session requests stop validating against it
pub async fn deactivate(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE skill SET status = 'inactive', updated_at = ?1 WHERE id = ?2 AND status = 'active'",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}
