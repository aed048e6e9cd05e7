//! Profile Repository
//!
//! The profile row doubles as the per-user balance aggregate: every
//! balance-affecting transaction bumps `lock_version` first, which takes the
//! row's write lock and serializes concurrent attempts on the same user.

use super::{RepoError, RepoResult, ledger};
use shared::models::{LedgerEntryType, Profile, ProfileCreate};
use sqlx::{SqliteConnection, SqlitePool};

const PROFILE_SELECT: &str =
    "SELECT user_id, display_name, level, lock_version, created_at, updated_at FROM profile";

pub async fn find_by_id(pool: &SqlitePool, user_id: i64) -> RepoResult<Option<Profile>> {
    let sql = format!("{PROFILE_SELECT} WHERE user_id = ?");
    let row = sqlx::query_as::<_, Profile>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id_in_tx(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> RepoResult<Option<Profile>> {
    let sql = format!("{PROFILE_SELECT} WHERE user_id = ?");
    let row = sqlx::query_as::<_, Profile>(&sql)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Create the profile if missing and append the initial credit grant.
///
/// Idempotent: an existing profile is returned untouched — the grant is only
/// written when the INSERT actually inserts, inside the same transaction.
pub async fn ensure(
    pool: &SqlitePool,
    data: ProfileCreate,
    initial_grant: i64,
) -> RepoResult<Profile> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "INSERT OR IGNORE INTO profile (user_id, display_name, level, lock_version, created_at, updated_at) VALUES (?1, ?2, ?3, 0, ?4, ?4)",
    )
    .bind(data.user_id)
    .bind(&data.display_name)
    .bind(data.level)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if rows.rows_affected() == 1 && initial_grant > 0 {
        ledger::append(
            &mut tx,
            ledger::NewLedgerEntry {
                user_id: data.user_id,
                entry_type: LedgerEntryType::Earned,
                amount: initial_grant,
                session_id: None,
                related_entry_id: None,
                description: "Initial credit grant".to_string(),
            },
        )
        .await?;
        tracing::info!(user_id = data.user_id, credits = initial_grant, "Profile created with initial grant");
    }

    tx.commit().await?;

    find_by_id(pool, data.user_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create profile".into()))
}

/// Take the user's balance write lock for the rest of the transaction.
///
/// Must be the first write of any balance-affecting transaction so the
/// available-balance read that follows cannot race a concurrent reservation.
pub async fn acquire_balance_lock(conn: &mut SqliteConnection, user_id: i64) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE profile SET lock_version = lock_version + 1 WHERE user_id = ?")
        .bind(user_id)
        .execute(conn)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Profile {user_id} not found")));
    }
    Ok(())
}

/// Update the reputation level (fed by the external reputation service)
pub async fn set_level(pool: &SqlitePool, user_id: i64, level: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE profile SET level = ?1, updated_at = ?2 WHERE user_id = ?3")
        .bind(level)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Profile {user_id} not found")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn create(user_id: i64, name: &str) -> ProfileCreate {
        ProfileCreate {
            user_id,
            display_name: name.to_string(),
            level: 1,
        }
    }

    #[tokio::test]
    async fn test_ensure_creates_profile_with_grant() {
        let pool = test_pool().await;
        let p = ensure(&pool, create(1, "Alice"), 10).await.unwrap();
        assert_eq!(p.user_id, 1);

        let bal = ledger::get_balance(&pool, 1).await.unwrap();
        assert_eq!(bal.total, 10);
        assert_eq!(bal.available, 10);
    }

    #[tokio::test]
    async fn test_ensure_idempotent_single_grant() {
        let pool = test_pool().await;
        ensure(&pool, create(1, "Alice"), 10).await.unwrap();
        ensure(&pool, create(1, "Alice"), 10).await.unwrap();

        let bal = ledger::get_balance(&pool, 1).await.unwrap();
        assert_eq!(bal.total, 10); // grant not doubled
    }

    #[tokio::test]
    async fn test_acquire_balance_lock_missing_profile() {
        let pool = test_pool().await;
        let mut tx = pool.begin().await.unwrap();
        let err = acquire_balance_lock(&mut tx, 999).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }
}
