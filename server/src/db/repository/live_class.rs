//! Live Class Repository
//!
//! Classes and their attendance rows. The UNIQUE(class_id, user_id)
//! constraint makes double-booking a structural Duplicate instead of a
//! race the service layer has to detect.

use super::{RepoError, RepoResult};
use shared::models::{ClassAttendance, ClassCreate, LiveClass, PaidStatus};
use sqlx::{SqliteConnection, SqlitePool};

const CLASS_SELECT: &str = "SELECT id, host_id, title, credit_cost, status, scheduled_at, created_at, updated_at FROM live_class";

const ATTENDANCE_SELECT: &str = "SELECT id, class_id, user_id, session_id, paid_status, created_at, updated_at FROM class_attendance";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<LiveClass>> {
    let sql = format!("{CLASS_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, LiveClass>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id_in_tx(
    conn: &mut SqliteConnection,
    id: i64,
) -> RepoResult<Option<LiveClass>> {
    let sql = format!("{CLASS_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, LiveClass>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn list_upcoming(pool: &SqlitePool) -> RepoResult<Vec<LiveClass>> {
    let sql = format!("{CLASS_SELECT} WHERE status IN ('scheduled', 'live') ORDER BY scheduled_at ASC");
    let rows = sqlx::query_as::<_, LiveClass>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, data: ClassCreate) -> RepoResult<LiveClass> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO live_class (id, host_id, title, credit_cost, status, scheduled_at, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 'scheduled', ?5, ?6, ?6)",
    )
    .bind(id)
    .bind(data.host_id)
    .bind(&data.title)
    .bind(data.credit_cost)
    .bind(data.scheduled_at)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create class".into()))
}

/// Claim the class row's write lock for the rest of the transaction
pub async fn lock_row(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE live_class SET updated_at = updated_at WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(rows.rows_affected() == 1)
}

/// scheduled -> live
pub async fn mark_live(conn: &mut SqliteConnection, id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE live_class SET status = 'live', updated_at = ?1 WHERE id = ?2 AND status = 'scheduled'",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// live -> completed
pub async fn mark_completed(conn: &mut SqliteConnection, id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE live_class SET status = 'completed', updated_at = ?1 WHERE id = ?2 AND status = 'live'",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// scheduled or live -> cancelled
pub async fn mark_cancelled(conn: &mut SqliteConnection, id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE live_class SET status = 'cancelled', updated_at = ?1 WHERE id = ?2 AND status IN ('scheduled', 'live')",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

// ---------- attendance ----------

pub async fn insert_attendance(
    conn: &mut SqliteConnection,
    class_id: i64,
    user_id: i64,
    session_id: i64,
) -> RepoResult<i64> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO class_attendance (id, class_id, user_id, session_id, paid_status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 'reserved', ?5, ?5)",
    )
    .bind(id)
    .bind(class_id)
    .bind(user_id)
    .bind(session_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(id)
}

pub async fn find_attendance(
    pool: &SqlitePool,
    class_id: i64,
    user_id: i64,
) -> RepoResult<Option<ClassAttendance>> {
    let sql = format!("{ATTENDANCE_SELECT} WHERE class_id = ?1 AND user_id = ?2");
    let row = sqlx::query_as::<_, ClassAttendance>(&sql)
        .bind(class_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_attendance_in_tx(
    conn: &mut SqliteConnection,
    class_id: i64,
    user_id: i64,
) -> RepoResult<Option<ClassAttendance>> {
    let sql = format!("{ATTENDANCE_SELECT} WHERE class_id = ?1 AND user_id = ?2");
    let row = sqlx::query_as::<_, ClassAttendance>(&sql)
        .bind(class_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn list_attendance(pool: &SqlitePool, class_id: i64) -> RepoResult<Vec<ClassAttendance>> {
    let sql = format!("{ATTENDANCE_SELECT} WHERE class_id = ? ORDER BY created_at ASC");
    let rows = sqlx::query_as::<_, ClassAttendance>(&sql)
        .bind(class_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Attendance rows whose seat is still reserved, i.e. neither settled nor
/// refunded. These are the ones class completion and cancellation fan out to.
pub async fn list_reserved_attendance(
    pool: &SqlitePool,
    class_id: i64,
) -> RepoResult<Vec<ClassAttendance>> {
    let sql = format!(
        "{ATTENDANCE_SELECT} WHERE class_id = ? AND paid_status = 'reserved' ORDER BY created_at ASC"
    );
    let rows = sqlx::query_as::<_, ClassAttendance>(&sql)
        .bind(class_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Follow the linked session's settlement: reserved -> paid/refunded/cancelled
pub async fn set_paid_status_for_session(
    conn: &mut SqliteConnection,
    session_id: i64,
    status: PaidStatus,
) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE class_attendance SET paid_status = ?1, updated_at = ?2 WHERE session_id = ?3 AND paid_status = 'reserved'",
    )
    .bind(status)
    .bind(now)
    .bind(session_id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::profile;
    use crate::db::repository::session::{self, NewSession};
    use crate::db::test_pool;
    use shared::models::{ProfileCreate, SessionOrigin, SessionStatus};

    async fn seed_user(pool: &SqlitePool, user_id: i64) {
        profile::ensure(
            pool,
            ProfileCreate {
                user_id,
                display_name: format!("user-{user_id}"),
                level: 1,
            },
            10,
        )
        .await
        .unwrap();
    }

    // Attendance rows reference a session row, so seed a real one per seat
    async fn seed_session(pool: &SqlitePool, learner: i64, teacher: i64) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        session::insert(
            &mut conn,
            NewSession {
                learner_id: learner,
                teacher_id: teacher,
                skill_id: None,
                origin: SessionOrigin::Class,
                status: SessionStatus::Scheduled,
                credits_amount: 3,
                scheduled_at: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_booking_is_structural() {
        let pool = test_pool().await;
        seed_user(&pool, 1).await;
        seed_user(&pool, 2).await;
        let class = create(
            &pool,
            ClassCreate {
                host_id: 1,
                title: "Intro to knots".into(),
                credit_cost: 3,
                scheduled_at: shared::util::now_millis() + 86_400_000,
            },
        )
        .await
        .unwrap();

        let first = seed_session(&pool, 2, 1).await;
        let second = seed_session(&pool, 2, 1).await;
        let mut conn = pool.acquire().await.unwrap();
        insert_attendance(&mut conn, class.id, 2, first).await.unwrap();
        let err = insert_attendance(&mut conn, class.id, 2, second)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn paid_status_update_is_guarded() {
        let pool = test_pool().await;
        seed_user(&pool, 1).await;
        seed_user(&pool, 2).await;
        let class = create(
            &pool,
            ClassCreate {
                host_id: 1,
                title: "Sourdough basics".into(),
                credit_cost: 3,
                scheduled_at: shared::util::now_millis() + 86_400_000,
            },
        )
        .await
        .unwrap();

        let sid = seed_session(&pool, 2, 1).await;
        let mut conn = pool.acquire().await.unwrap();
        insert_attendance(&mut conn, class.id, 2, sid).await.unwrap();

        let rows = set_paid_status_for_session(&mut conn, sid, PaidStatus::Paid)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        // Already settled rows are not touched again
        let rows = set_paid_status_for_session(&mut conn, sid, PaidStatus::Refunded)
            .await
            .unwrap();
        assert_eq!(rows, 0);

        // Release the single pooled connection before acquiring another
        drop(conn);
        let att = find_attendance(&pool, class.id, 2).await.unwrap().unwrap();
        assert_eq!(att.paid_status, PaidStatus::Paid);
    }
}
