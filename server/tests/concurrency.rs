//! Concurrent-access properties: no double spend, no double transition.

use sqlx::SqlitePool;
use tempfile::TempDir;

use swap_server::db::DbService;
use swap_server::db::repository::{ledger, profile, skill};
use swap_server::utils::AppError;
use swap_server::sessions;
use shared::models::{ProfileCreate, SessionCreate, SessionStatus, SkillCreate};

const MAX_CREDITS: i64 = 100;

async fn setup() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("swap.db");
    let db = DbService::new(path.to_str().unwrap()).await.unwrap();
    (dir, db.pool().clone())
}

async fn seed_user(pool: &SqlitePool, user_id: i64, grant: i64) {
    profile::ensure(
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

async fn make_session(pool: &SqlitePool, learner: i64, teacher: i64, credits: i64) -> i64 {
    let sk = skill::create(
        pool,
        SkillCreate {
            teacher_id: teacher,
            title: "Pairing session".into(),
            credits_required: credits,
        },
    )
    .await
    .unwrap();
    sessions::create_request(
        pool,
        SessionCreate {
            learner_id: learner,
            teacher_id: teacher,
            skill_id: sk.id,
        },
        MAX_CREDITS,
    )
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn parallel_completes_pay_exactly_once() {
    let (_dir, pool) = setup().await;
    seed_user(&pool, 1, 10).await;
    seed_user(&pool, 2, 0).await;

    let sid = make_session(&pool, 1, 2, 6).await;
    sessions::accept(&pool, sid, 2).await.unwrap();
    sessions::schedule(&pool, sid, 1, shared::util::now_millis()).await.unwrap();
    sessions::start(&pool, sid, 1).await.unwrap();

    let mut handles = Vec::new();
    for actor in [1, 2, 1, 2] {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            sessions::complete(&pool, sid, actor).await
        }));
    }
    for h in handles {
        // Every caller sees success: one performs the transfer, the rest
        // observe the completed session
        h.await.unwrap().unwrap();
    }

    let teacher = ledger::get_balance(&pool, 2).await.unwrap();
    assert_eq!(teacher.total, 6);
    let learner = ledger::get_balance(&pool, 1).await.unwrap();
    assert_eq!((learner.total, learner.reserved, learner.available), (4, 0, 4));
}

#[tokio::test]
async fn parallel_accepts_transition_once() {
    let (_dir, pool) = setup().await;
    seed_user(&pool, 1, 10).await;
    seed_user(&pool, 2, 0).await;

    let sid = make_session(&pool, 1, 2, 4).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pool = pool.clone();
        handles.push(tokio::spawn(
            async move { sessions::accept(&pool, sid, 2).await },
        ));
    }
    for h in handles {
        let s = h.await.unwrap().unwrap();
        assert_eq!(s.status, SessionStatus::Accepted);
    }
}

#[tokio::test]
async fn parallel_overdraw_reserves_once() {
    let (_dir, pool) = setup().await;
    seed_user(&pool, 1, 10).await;
    seed_user(&pool, 2, 0).await;
    seed_user(&pool, 3, 0).await;

    // Two 7-credit requests against a 10-credit balance: exactly one wins
    let sk_a = skill::create(
        &pool,
        SkillCreate {
            teacher_id: 2,
            title: "Sketching".into(),
            credits_required: 7,
        },
    )
    .await
    .unwrap();
    let sk_b = skill::create(
        &pool,
        SkillCreate {
            teacher_id: 3,
            title: "Juggling".into(),
            credits_required: 7,
        },
    )
    .await
    .unwrap();

    let mut handles = Vec::new();
    for (teacher, skill_id) in [(2, sk_a.id), (3, sk_b.id)] {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            sessions::create_request(
                &pool,
                SessionCreate {
                    learner_id: 1,
                    teacher_id: teacher,
                    skill_id,
                },
                MAX_CREDITS,
            )
            .await
        }));
    }

    let mut ok = 0;
    let mut insufficient = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(AppError::InsufficientCredits(_)) => insufficient += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((ok, insufficient), (1, 1));

    let bal = ledger::get_balance(&pool, 1).await.unwrap();
    assert_eq!((bal.total, bal.reserved, bal.available), (10, 7, 3));
}

#[tokio::test]
async fn complete_and_cancel_race_settles_once() {
    let (_dir, pool) = setup().await;
    seed_user(&pool, 1, 10).await;
    seed_user(&pool, 2, 0).await;

    let sid = make_session(&pool, 1, 2, 5).await;
    sessions::accept(&pool, sid, 2).await.unwrap();
    sessions::schedule(&pool, sid, 1, shared::util::now_millis()).await.unwrap();
    sessions::start(&pool, sid, 1).await.unwrap();

    let p1 = pool.clone();
    let complete = tokio::spawn(async move { sessions::complete(&p1, sid, 2).await });
    let p2 = pool.clone();
    let cancel = tokio::spawn(async move { sessions::cancel(&p2, sid, 1, None).await });

    let complete_res = complete.await.unwrap();
    let cancel_res = cancel.await.unwrap();

    // One transition wins; the loser gets InvalidStateTransition
    assert!(complete_res.is_ok() ^ cancel_res.is_ok());

    let learner = ledger::get_balance(&pool, 1).await.unwrap();
    let teacher = ledger::get_balance(&pool, 2).await.unwrap();
    assert_eq!(learner.reserved, 0);
    assert_eq!(learner.total + teacher.total, 10); // credits conserved
    let final_state = sessions::get(&pool, sid).await.unwrap();
    assert!(matches!(
        final_state.status,
        SessionStatus::Completed | SessionStatus::Cancelled
    ));
    if final_state.status == SessionStatus::Completed {
        assert_eq!(teacher.total, 5);
    } else {
        assert_eq!(learner.total, 10);
    }
}
