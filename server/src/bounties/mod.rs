//! Bounty Service
//!
//! Reverse-direction entry point: a poster offers credits to be taught
//! something. Claiming converts the bounty into an `accepted` session
//! (learner = poster, teacher = claimer) and reserves the poster's credits,
//! all in one transaction. From there the shared session state machine takes
//! over and mirrors its terminal states back onto the bounty.

use sqlx::SqlitePool;

use crate::db::repository::{RepoError, bounty as bounty_repo, profile};
use crate::db::repository::session::NewSession;
use crate::sessions;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation;
use shared::models::{Bounty, BountyCreate, BountyStatus, SessionOrigin, SessionStatus};

pub async fn get(pool: &SqlitePool, id: i64) -> AppResult<Bounty> {
    bounty_repo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bounty {id} not found")))
}

pub async fn list_open(pool: &SqlitePool) -> AppResult<Vec<Bounty>> {
    Ok(bounty_repo::list_open(pool).await?)
}

/// Post a new bounty. The poster's credits are not reserved yet; that
/// happens at claim time, against the poster's balance as of then.
pub async fn create(pool: &SqlitePool, data: BountyCreate, max_credits: i64) -> AppResult<Bounty> {
    let title = validation::require_title(&data.title)?;
    validation::require_credit_amount(data.credits_offered, max_credits)?;
    profile::find_by_id(pool, data.poster_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", data.poster_id)))?;

    let bounty = bounty_repo::create(
        pool,
        BountyCreate {
            poster_id: data.poster_id,
            title,
            credits_offered: data.credits_offered,
        },
    )
    .await?;
    tracing::info!(
        bounty_id = bounty.id,
        poster_id = bounty.poster_id,
        credits = bounty.credits_offered,
        "Bounty posted"
    );
    Ok(bounty)
}

/// Claim an open bounty.
///
/// The claimer must clear the level gate. Exactly one claimer wins a race:
/// the guarded open -> claimed UPDATE decides, and the loser sees a
/// Conflict. Creates the `accepted` session and the poster's reservation in
/// the same transaction.
pub async fn claim(
    pool: &SqlitePool,
    bounty_id: i64,
    claimer_id: i64,
    min_claim_level: i64,
) -> AppResult<Bounty> {
    let claimer = profile::find_by_id(pool, claimer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {claimer_id} not found")))?;
    if claimer.level < min_claim_level {
        return Err(AppError::Forbidden(format!(
            "Level {} is below the claim threshold {min_claim_level}",
            claimer.level
        )));
    }

    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    if !bounty_repo::lock_row(&mut tx, bounty_id).await? {
        return Err(AppError::NotFound(format!("Bounty {bounty_id} not found")));
    }
    let bounty = bounty_repo::find_by_id_in_tx(&mut tx, bounty_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bounty {bounty_id} not found")))?;

    match bounty.status {
        // Replay by the same claimer is an idempotent success
        BountyStatus::Claimed if bounty.claimer_id == Some(claimer_id) => return Ok(bounty),
        BountyStatus::Open => {}
        _ => {
            return Err(AppError::Conflict(format!(
                "Bounty {bounty_id} is no longer open"
            )));
        }
    }
    validation::require_distinct_parties(bounty.poster_id, claimer_id)?;

    let session = sessions::create_in_tx(
        &mut tx,
        NewSession {
            learner_id: bounty.poster_id,
            teacher_id: claimer_id,
            skill_id: None,
            origin: SessionOrigin::Bounty,
            status: SessionStatus::Accepted,
            credits_amount: bounty.credits_offered,
            scheduled_at: None,
        },
        &format!("Reserved for bounty: {}", bounty.title),
    )
    .await?;

    if bounty_repo::mark_claimed(&mut tx, bounty_id, claimer_id, session.id).await? == 0 {
        return Err(AppError::Conflict(format!(
            "Bounty {bounty_id} was claimed concurrently"
        )));
    }
    tx.commit().await.map_err(RepoError::from)?;

    tracing::info!(
        bounty_id,
        claimer_id,
        session_id = session.id,
        "Bounty claimed"
    );
    get(pool, bounty_id).await
}

/// Cancel an unclaimed bounty. Claimed bounties are cancelled through their
/// session instead.
pub async fn cancel(pool: &SqlitePool, bounty_id: i64, poster_id: i64) -> AppResult<Bounty> {
    let mut tx = pool.begin().await.map_err(RepoError::from)?;
    if !bounty_repo::lock_row(&mut tx, bounty_id).await? {
        return Err(AppError::NotFound(format!("Bounty {bounty_id} not found")));
    }
    let bounty = bounty_repo::find_by_id_in_tx(&mut tx, bounty_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bounty {bounty_id} not found")))?;
    if bounty.poster_id != poster_id {
        return Err(AppError::Forbidden(format!(
            "Only the poster may cancel bounty {bounty_id}"
        )));
    }
    match bounty.status {
        BountyStatus::Cancelled => return Ok(bounty),
        BountyStatus::Open => {}
        _ => {
            return Err(AppError::InvalidStateTransition(format!(
                "Bounty {bounty_id} is claimed; cancel its session instead"
            )));
        }
    }
    if bounty_repo::mark_cancelled(&mut tx, bounty_id).await? == 0 {
        return Err(AppError::Conflict(format!(
            "Bounty {bounty_id} changed state concurrently"
        )));
    }
    tx.commit().await.map_err(RepoError::from)?;
    tracing::info!(bounty_id, "Bounty cancelled");
    get(pool, bounty_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ledger;
    use crate::db::repository::profile::ensure;
    use crate::db::test_pool;
    use crate::sessions;
    use shared::models::ProfileCreate;

    const MAX_CREDITS: i64 = 100;
    const MIN_LEVEL: i64 = 2;

    async fn seed_user(pool: &SqlitePool, user_id: i64, grant: i64, level: i64) {
        ensure(
            pool,
            ProfileCreate {
                user_id,
                display_name: format!("user-{user_id}"),
                level,
            },
            grant,
        )
        .await
        .unwrap();
    }

    async fn post_bounty(pool: &SqlitePool, poster_id: i64, credits: i64) -> Bounty {
        create(
            pool,
            BountyCreate {
                poster_id,
                title: "Teach me lifetimes".into(),
                credits_offered: credits,
            },
            MAX_CREDITS,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_claim_creates_accepted_session_and_reserves() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10, 1).await;
        seed_user(&pool, 2, 0, 3).await;

        let b = post_bounty(&pool, 1, 6).await;
        let claimed = claim(&pool, b.id, 2, MIN_LEVEL).await.unwrap();

        assert_eq!(claimed.status, BountyStatus::Claimed);
        assert_eq!(claimed.claimer_id, Some(2));
        let session = sessions::get(&pool, claimed.session_id.unwrap()).await.unwrap();
        assert_eq!(session.status, SessionStatus::Accepted);
        assert_eq!(session.learner_id, 1);
        assert_eq!(session.teacher_id, 2);

        let poster = ledger::get_balance(&pool, 1).await.unwrap();
        assert_eq!((poster.total, poster.reserved, poster.available), (10, 6, 4));
    }

    #[tokio::test]
    async fn test_claim_below_level_gate() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10, 1).await;
        seed_user(&pool, 2, 0, 1).await;

        let b = post_bounty(&pool, 1, 6).await;
        let err = claim(&pool, b.id, 2, MIN_LEVEL).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // No session, no reservation
        let bounty = get(&pool, b.id).await.unwrap();
        assert_eq!(bounty.status, BountyStatus::Open);
        let poster = ledger::get_balance(&pool, 1).await.unwrap();
        assert_eq!(poster.reserved, 0);
    }

    #[tokio::test]
    async fn test_second_claimer_conflicts_first_replays() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10, 1).await;
        seed_user(&pool, 2, 0, 3).await;
        seed_user(&pool, 3, 0, 3).await;

        let b = post_bounty(&pool, 1, 6).await;
        claim(&pool, b.id, 2, MIN_LEVEL).await.unwrap();

        let err = claim(&pool, b.id, 3, MIN_LEVEL).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let replay = claim(&pool, b.id, 2, MIN_LEVEL).await.unwrap();
        assert_eq!(replay.claimer_id, Some(2));
        let poster = ledger::get_balance(&pool, 1).await.unwrap();
        assert_eq!(poster.reserved, 6); // reserved once
    }

    #[tokio::test]
    async fn test_session_completion_completes_bounty() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10, 1).await;
        seed_user(&pool, 2, 0, 3).await;

        let b = post_bounty(&pool, 1, 6).await;
        let claimed = claim(&pool, b.id, 2, MIN_LEVEL).await.unwrap();
        let sid = claimed.session_id.unwrap();

        sessions::schedule(&pool, sid, 1, shared::util::now_millis()).await.unwrap();
        sessions::start(&pool, sid, 2).await.unwrap();
        sessions::complete(&pool, sid, 1).await.unwrap();

        let bounty = get(&pool, b.id).await.unwrap();
        assert_eq!(bounty.status, BountyStatus::Completed);
        let claimer = ledger::get_balance(&pool, 2).await.unwrap();
        assert_eq!(claimer.total, 6);
    }

    #[tokio::test]
    async fn test_session_cancellation_cancels_bounty() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10, 1).await;
        seed_user(&pool, 2, 0, 3).await;

        let b = post_bounty(&pool, 1, 6).await;
        let claimed = claim(&pool, b.id, 2, MIN_LEVEL).await.unwrap();
        let sid = claimed.session_id.unwrap();

        sessions::cancel(&pool, sid, 1, Some("found help elsewhere")).await.unwrap();

        let bounty = get(&pool, b.id).await.unwrap();
        assert_eq!(bounty.status, BountyStatus::Cancelled);
        let poster = ledger::get_balance(&pool, 1).await.unwrap();
        assert_eq!((poster.total, poster.reserved, poster.available), (10, 0, 10));
    }

    #[tokio::test]
    async fn test_cancel_open_bounty_poster_only() {
        let pool = test_pool().await;
        seed_user(&pool, 1, 10, 1).await;
        seed_user(&pool, 2, 0, 3).await;

        let b = post_bounty(&pool, 1, 6).await;
        let err = cancel(&pool, b.id, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let cancelled = cancel(&pool, b.id, 1).await.unwrap();
        assert_eq!(cancelled.status, BountyStatus::Cancelled);
    }
}
