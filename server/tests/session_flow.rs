//! End-to-end flows over a real (file-backed) database.

use sqlx::SqlitePool;
use tempfile::TempDir;

use swap_server::db::DbService;
use swap_server::db::repository::{ledger, live_class, profile, skill};
use swap_server::{bounties, classes, sessions, sweeper};
use shared::models::{
    BountyCreate, BountyStatus, ClassCreate, ClassStatus, DisputeResolution, PaidStatus,
    ProfileCreate, SessionCreate, SessionStatus, SkillCreate,
};

const MAX_CREDITS: i64 = 100;
const MIN_LEVEL: i64 = 2;

async fn setup() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("swap.db");
    let db = DbService::new(path.to_str().unwrap()).await.unwrap();
    (dir, db.pool().clone())
}

async fn seed_user(pool: &SqlitePool, user_id: i64, grant: i64, level: i64) {
    profile::ensure(
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

#[tokio::test]
async fn direct_request_full_lifecycle() {
    let (_dir, pool) = setup().await;
    seed_user(&pool, 1, 10, 1).await;
    seed_user(&pool, 2, 10, 1).await;

    let sk = skill::create(
        &pool,
        SkillCreate {
            teacher_id: 2,
            title: "Wheel building".into(),
            credits_required: 7,
        },
    )
    .await
    .unwrap();

    let s = sessions::create_request(
        &pool,
        SessionCreate {
            learner_id: 1,
            teacher_id: 2,
            skill_id: sk.id,
        },
        MAX_CREDITS,
    )
    .await
    .unwrap();

    let bal = ledger::get_balance(&pool, 1).await.unwrap();
    assert_eq!((bal.total, bal.reserved, bal.available), (10, 7, 3));

    sessions::accept(&pool, s.id, 2).await.unwrap();
    sessions::schedule(&pool, s.id, 1, shared::util::now_millis() + 3_600_000)
        .await
        .unwrap();
    sessions::start(&pool, s.id, 2).await.unwrap();
    let done = sessions::complete(&pool, s.id, 1).await.unwrap();
    assert_eq!(done.status, SessionStatus::Completed);

    let learner = ledger::get_balance(&pool, 1).await.unwrap();
    assert_eq!((learner.total, learner.reserved, learner.available), (3, 0, 3));
    let teacher = ledger::get_balance(&pool, 2).await.unwrap();
    assert_eq!((teacher.total, teacher.reserved, teacher.available), (17, 0, 17));

    // Full audit trail for the session: locked, spent, earned
    let entries = ledger::list_by_session(&pool, s.id).await.unwrap();
    assert_eq!(entries.len(), 3);
    let sum: i64 = entries
        .iter()
        .filter(|e| {
            matches!(
                e.entry_type,
                shared::models::LedgerEntryType::Spent | shared::models::LedgerEntryType::Earned
            )
        })
        .map(|e| e.amount)
        .sum();
    assert_eq!(sum, 0); // transfer conserves credits
}

#[tokio::test]
async fn bounty_claim_flow_with_dispute() {
    let (_dir, pool) = setup().await;
    seed_user(&pool, 1, 20, 1).await; // poster
    seed_user(&pool, 2, 0, 3).await; // claimer

    let b = bounties::create(
        &pool,
        BountyCreate {
            poster_id: 1,
            title: "Explain async cancellation".into(),
            credits_offered: 8,
        },
        MAX_CREDITS,
    )
    .await
    .unwrap();

    let claimed = bounties::claim(&pool, b.id, 2, MIN_LEVEL).await.unwrap();
    let sid = claimed.session_id.unwrap();

    sessions::schedule(&pool, sid, 2, shared::util::now_millis()).await.unwrap();
    sessions::start(&pool, sid, 1).await.unwrap();
    sessions::dispute(&pool, sid, 1, Some("didn't show")).await.unwrap();

    let resolved = sessions::resolve_dispute(&pool, sid, DisputeResolution::Release, None)
        .await
        .unwrap();
    assert_eq!(resolved.status, SessionStatus::Cancelled);

    let bounty = bounties::get(&pool, b.id).await.unwrap();
    assert_eq!(bounty.status, BountyStatus::Cancelled);

    let poster = ledger::get_balance(&pool, 1).await.unwrap();
    assert_eq!((poster.total, poster.reserved, poster.available), (20, 0, 20));
    let claimer = ledger::get_balance(&pool, 2).await.unwrap();
    assert_eq!(claimer.total, 0);
}

#[tokio::test]
async fn class_booking_completion_pays_host() {
    let (_dir, pool) = setup().await;
    seed_user(&pool, 1, 0, 1).await; // host
    seed_user(&pool, 2, 10, 1).await;
    seed_user(&pool, 3, 10, 1).await;

    let class = classes::create(
        &pool,
        ClassCreate {
            host_id: 1,
            title: "Fermentation basics".into(),
            credit_cost: 3,
            scheduled_at: shared::util::now_millis() + 86_400_000,
        },
        MAX_CREDITS,
    )
    .await
    .unwrap();

    classes::book(&pool, class.id, 2).await.unwrap();
    classes::book(&pool, class.id, 3).await.unwrap();

    classes::start(&pool, class.id, 1).await.unwrap();
    let done = classes::complete(&pool, class.id, 1).await.unwrap();
    assert_eq!(done.status, ClassStatus::Completed);

    let host = ledger::get_balance(&pool, 1).await.unwrap();
    assert_eq!(host.total, 6);

    for attendee in [2, 3] {
        let att = live_class::find_attendance(&pool, class.id, attendee)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(att.paid_status, PaidStatus::Paid);
    }
}

#[tokio::test]
async fn expired_requests_are_swept() {
    let (_dir, pool) = setup().await;
    seed_user(&pool, 1, 10, 1).await;
    seed_user(&pool, 2, 10, 1).await;

    let sk = skill::create(
        &pool,
        SkillCreate {
            teacher_id: 2,
            title: "Bike maintenance".into(),
            credits_required: 5,
        },
    )
    .await
    .unwrap();
    let s = sessions::create_request(
        &pool,
        SessionCreate {
            learner_id: 1,
            teacher_id: 2,
            skill_id: sk.id,
        },
        MAX_CREDITS,
    )
    .await
    .unwrap();

    let report = sweeper::sweep_expired(&pool, -1000).await.unwrap();
    assert_eq!(report.cancelled_session_ids, vec![s.id]);

    let bal = ledger::get_balance(&pool, 1).await.unwrap();
    assert_eq!((bal.total, bal.reserved, bal.available), (10, 0, 10));
}
