//! Reservation expiry sweeper
//!
//! Periodic task that reclaims credits held by session requests nobody ever
//! accepted. Each expired session is cancelled through the normal transition
//! (system actor, reason "expired") in its own short transaction, so the
//! sweeper can race manual cancels or another sweeper instance and the loser
//! just observes a no-op.

use std::time::Duration;

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::db::repository::ledger;
use crate::sessions;
use crate::utils::error::AppResult;

/// What one sweep pass did
#[derive(Debug, serde::Serialize)]
pub struct SweepReport {
    pub cancelled_count: usize,
    pub cancelled_session_ids: Vec<i64>,
}

/// One pass: cancel every `requested` session whose reservation is older
/// than `timeout_ms`.
pub async fn sweep_expired(pool: &SqlitePool, timeout_ms: i64) -> AppResult<SweepReport> {
    let cutoff = shared::util::now_millis() - timeout_ms;
    let locks = ledger::find_expired_locks(pool, cutoff).await?;

    let mut cancelled_session_ids = Vec::new();
    for lock in locks {
        let Some(session_id) = lock.session_id else {
            continue;
        };
        match sessions::cancel_expired(pool, session_id).await {
            Ok(true) => cancelled_session_ids.push(session_id),
            Ok(false) => {} // someone moved the session first
            Err(e) => {
                tracing::error!(session_id, error = %e, "Failed to cancel expired session");
            }
        }
    }

    if !cancelled_session_ids.is_empty() {
        tracing::info!(
            count = cancelled_session_ids.len(),
            "Expired reservations reclaimed"
        );
    }
    Ok(SweepReport {
        cancelled_count: cancelled_session_ids.len(),
        cancelled_session_ids,
    })
}

/// Background loop driving [`sweep_expired`] on a fixed interval.
///
/// Registered in `start_background_tasks()`.
pub struct ExpirySweeper {
    pool: SqlitePool,
    interval: Duration,
    timeout_ms: i64,
    shutdown: CancellationToken,
}

impl ExpirySweeper {
    pub fn new(
        pool: SqlitePool,
        interval: Duration,
        timeout_ms: i64,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pool,
            interval,
            timeout_ms,
            shutdown,
        }
    }

    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            timeout_ms = self.timeout_ms,
            "Expiry sweeper started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    if let Err(e) = sweep_expired(&self.pool, self.timeout_ms).await {
                        tracing::error!(error = %e, "Sweep pass failed");
                    }
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::profile::ensure;
    use crate::db::repository::skill;
    use crate::db::test_pool;
    use crate::sessions;
    use shared::models::{ProfileCreate, SessionCreate, SessionStatus, SkillCreate};

    async fn seed_user(pool: &SqlitePool, user_id: i64) {
        ensure(
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

    #[tokio::test]
    async fn test_sweep_cancels_stale_requests_only() {
        let pool = test_pool().await;
        seed_user(&pool, 1).await;
        seed_user(&pool, 2).await;
        let sk = skill::create(
            &pool,
            SkillCreate {
                teacher_id: 2,
                title: "Knife sharpening".into(),
                credits_required: 4,
            },
        )
        .await
        .unwrap();

        let stale = sessions::create_request(
            &pool,
            SessionCreate {
                learner_id: 1,
                teacher_id: 2,
                skill_id: sk.id,
            },
            100,
        )
        .await
        .unwrap();
        let accepted = sessions::create_request(
            &pool,
            SessionCreate {
                learner_id: 1,
                teacher_id: 2,
                skill_id: sk.id,
            },
            100,
        )
        .await
        .unwrap();
        sessions::accept(&pool, accepted.id, 2).await.unwrap();

        // Negative timeout puts the cutoff in the future: every outstanding
        // requested-session lock counts as stale
        let report = sweep_expired(&pool, -1000).await.unwrap();
        assert_eq!(report.cancelled_count, 1);
        assert_eq!(report.cancelled_session_ids, vec![stale.id]);

        let s = sessions::get(&pool, stale.id).await.unwrap();
        assert_eq!(s.status, SessionStatus::Cancelled);
        assert_eq!(s.cancellation_reason.as_deref(), Some("expired"));
        assert_eq!(s.cancelled_by, None);

        // The accepted session keeps its hold
        let s = sessions::get(&pool, accepted.id).await.unwrap();
        assert_eq!(s.status, SessionStatus::Accepted);

        // Re-running finds nothing
        let report = sweep_expired(&pool, -1000).await.unwrap();
        assert_eq!(report.cancelled_count, 0);
    }
}
