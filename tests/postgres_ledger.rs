//! Ledger tests against a live Postgres database
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test postgres_ledger -- --ignored

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use maintrack_server::{
    error::AppError,
    models::assignment::AssignmentDraft,
    repository::{AssignmentLedger, Repository},
};

async fn connect() -> Pool<Postgres> {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Fresh equipment, user and projects so runs never see each other's rows
async fn seed(pool: &Pool<Postgres>, projects: usize) -> (i32, i32, Vec<i32>) {
    let tag = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let user_id: i32 = sqlx::query_scalar("INSERT INTO users (login) VALUES ($1) RETURNING id")
        .bind(format!("ledger-test-{}", tag))
        .fetch_one(pool)
        .await
        .unwrap();
    let equipment_id: i32 =
        sqlx::query_scalar("INSERT INTO equipment (name, status) VALUES ($1, 0) RETURNING id")
            .bind(format!("Tower crane {}", tag))
            .fetch_one(pool)
            .await
            .unwrap();

    let mut project_ids = Vec::new();
    for n in 0..projects {
        let id: i32 = sqlx::query_scalar("INSERT INTO projects (name) VALUES ($1) RETURNING id")
            .bind(format!("Site {} / {}", n, tag))
            .fetch_one(pool)
            .await
            .unwrap();
        project_ids.push(id);
    }
    (equipment_id, user_id, project_ids)
}

fn exclusive_draft(equipment_id: i32, project_id: i32, assigned_by: i32) -> AssignmentDraft {
    AssignmentDraft {
        equipment_id,
        project_id,
        assigned_by,
        is_shared: false,
        authorization_code: None,
        expected_return_at: None,
        notes: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Run with: cargo test -- --ignored
async fn test_concurrent_exclusive_creates_commit_exactly_one() {
    let pool = connect().await;
    let (equipment_id, user_id, projects) = seed(&pool, 6).await;
    let repository = Repository::new(pool);

    let mut handles = Vec::new();
    for project_id in projects {
        let repository = repository.clone();
        handles.push(tokio::spawn(async move {
            repository
                .create(&exclusive_draft(equipment_id, project_id, user_id))
                .await
        }));
    }

    let mut committed = Vec::new();
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(assignment) => committed.push(assignment),
            Err(AppError::LedgerConflict { blocking }) => {
                assert_eq!(blocking.equipment_id, equipment_id);
                assert!(!blocking.is_shared);
                refused += 1;
            }
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(committed.len(), 1);
    assert_eq!(refused, 5);

    let active = repository.find_active_assignments(equipment_id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, committed[0].id);
}

#[tokio::test]
#[ignore]
async fn test_close_frees_equipment_and_cannot_repeat() {
    let pool = connect().await;
    let (equipment_id, user_id, projects) = seed(&pool, 2).await;
    let repository = Repository::new(pool);

    let first = repository
        .create(&exclusive_draft(equipment_id, projects[0], user_id))
        .await
        .unwrap();
    let err = repository
        .create(&exclusive_draft(equipment_id, projects[1], user_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::LedgerConflict { .. }));

    repository.close(first.id, first.assigned_at).await.unwrap();
    let err = repository.close(first.id, first.assigned_at).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyClosed { .. }));

    repository
        .create(&exclusive_draft(equipment_id, projects[1], user_id))
        .await
        .unwrap();
}
