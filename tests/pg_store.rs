//! Runs the Postgres repositories against a real database. Set
//! `TEST_DATABASE_URL` to enable; the tests return early otherwise.

mod common;

use common::pg;
use marketplace::{
    applications::{repo::ApplicationRepo, repo_types::NewAttachment},
    auth::{
        repo::{RefreshTokenRepo, UserRepo},
        repo_types::NewUser,
    },
    db::{PgStore, StoreError},
    jobs::{repo::JobRepo, repo_types::NewJob},
    types::{ApplicationStatus, HoursPerWeek, JobStatus, JobType, ProjectLength, RateKind, Role},
};

async fn user(store: &PgStore, email: &str, role: Role) -> i64 {
    store
        .create_user(NewUser {
            email: email.into(),
            password_hash: "x".into(),
            name: "A".into(),
            surname: "B".into(),
            role,
        })
        .await
        .expect("user should be persisted")
        .id
}

async fn open_job(store: &PgStore, client_id: i64) -> i64 {
    store
        .create_job(
            NewJob {
                client_id,
                title: "J1".into(),
                description: "Build".into(),
                job_type: JobType::OneTime,
                rate: RateKind::Fixed,
                amount: 300,
                length: ProjectLength::OneToThree,
                hours_per_week: HoursPerWeek::TenToTwenty,
            },
            &[],
        )
        .await
        .expect("job should be persisted")
        .id
}

#[tokio::test]
async fn accept_assigns_the_job_and_rejects_siblings() {
    let Some(db) = pg::provision().await else { return };
    let store = &db.store;
    let client = user(store, "c@x.com", Role::Client).await;
    let f1 = user(store, "f1@x.com", Role::Freelancer).await;
    let f2 = user(store, "f2@x.com", Role::Freelancer).await;
    let job_id = open_job(store, client).await;

    let a1 = store.create_application(f1, job_id, "first").await.unwrap();
    let a2 = store.create_application(f2, job_id, "second").await.unwrap();

    let outcome = store.accept_application(a1.id, "taken").await.unwrap();
    assert_eq!(outcome.application.status, ApplicationStatus::Accepted);
    assert_eq!(outcome.job.status, JobStatus::InProgress);
    assert_eq!(outcome.job.freelancer_id, Some(f1));
    assert_eq!(outcome.auto_rejected, vec![a2.id]);

    let sibling = store.find_application(a2.id).await.unwrap().unwrap();
    assert_eq!(sibling.status, ApplicationStatus::Rejected);
    assert_eq!(sibling.rejection_reason.as_deref(), Some("taken"));
    let job = store.find_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::InProgress);
}

#[tokio::test]
async fn stale_accept_changes_nothing() {
    let Some(db) = pg::provision().await else { return };
    let store = &db.store;
    let client = user(store, "c@x.com", Role::Client).await;
    let f1 = user(store, "f1@x.com", Role::Freelancer).await;
    let f2 = user(store, "f2@x.com", Role::Freelancer).await;
    let f3 = user(store, "f3@x.com", Role::Freelancer).await;
    let job_id = open_job(store, client).await;

    let a1 = store.create_application(f1, job_id, "first").await.unwrap();
    let a2 = store.create_application(f2, job_id, "second").await.unwrap();
    store.accept_application(a1.id, "taken").await.unwrap();

    assert!(matches!(
        store.accept_application(a2.id, "taken").await,
        Err(StoreError::StaleState(_))
    ));
    assert!(matches!(
        store.reject_application(a2.id, "no").await,
        Err(StoreError::StaleState(_))
    ));
    assert!(matches!(
        store.accept_application(a2.id + 100, "taken").await,
        Err(StoreError::NotFound)
    ));
    let job = store.find_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.freelancer_id, Some(f1));

    // a closed job takes no new applications
    assert!(matches!(
        store.create_application(f3, job_id, "late").await,
        Err(StoreError::StaleState(_))
    ));
    assert_eq!(store.count_applications_by_job(job_id).await.unwrap(), 2);
}

#[tokio::test]
async fn duplicate_application_conflicts() {
    let Some(db) = pg::provision().await else { return };
    let store = &db.store;
    let client = user(store, "c@x.com", Role::Client).await;
    let f1 = user(store, "f1@x.com", Role::Freelancer).await;
    let job_id = open_job(store, client).await;

    store.create_application(f1, job_id, "first").await.unwrap();
    assert!(matches!(
        store.create_application(f1, job_id, "again").await,
        Err(StoreError::Conflict(_))
    ));
    assert_eq!(store.list_applications_by_user(f1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn attachment_swap_is_all_or_nothing() {
    let Some(db) = pg::provision().await else { return };
    let store = &db.store;
    let client = user(store, "c@x.com", Role::Client).await;
    let f1 = user(store, "f1@x.com", Role::Freelancer).await;
    let job_id = open_job(store, client).await;

    let app = store.create_application(f1, job_id, "first").await.unwrap();
    let first = store.create_attachment(app.id, "cv.pdf", "applications/1/a.pdf").await.unwrap();

    let file = NewAttachment {
        file_name: "resume.pdf",
        storage_key: "applications/1/b.pdf",
    };
    let revision = store
        .update_pending_application(app.id, Some("second".into()), Some(file))
        .await
        .unwrap();
    assert_eq!(revision.application.description, "second");
    assert_eq!(revision.replaced.map(|a| a.id), Some(first.id));
    let current = store.attachment_for_application(app.id).await.unwrap().unwrap();
    assert_eq!(current.storage_key, "applications/1/b.pdf");

    store.reject_application(app.id, "no").await.unwrap();
    let late = NewAttachment {
        file_name: "late.pdf",
        storage_key: "applications/1/c.pdf",
    };
    assert!(matches!(
        store.update_pending_application(app.id, Some("third".into()), Some(late)).await,
        Err(StoreError::StaleState(_))
    ));
    assert_eq!(store.attachment_for_application(app.id).await.unwrap(), Some(current));
    let app = store.find_application(app.id).await.unwrap().unwrap();
    assert_eq!(app.description, "second");
}

#[tokio::test]
async fn refresh_tokens_rotate_once() {
    let Some(db) = pg::provision().await else { return };
    let store = &db.store;
    let id = user(store, "f@x.com", Role::Freelancer).await;

    store.replace_refresh_tokens(id, "t1").await.unwrap();
    store.rotate_refresh_token(id, "t1", "t2").await.unwrap();
    assert!(matches!(
        store.rotate_refresh_token(id, "t1", "t3").await,
        Err(StoreError::NotFound)
    ));
    store.rotate_refresh_token(id, "t2", "t3").await.unwrap();

    store.delete_refresh_tokens(id).await.unwrap();
    assert!(matches!(
        store.rotate_refresh_token(id, "t3", "t4").await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn deleting_a_user_cascades_to_their_applications() {
    let Some(db) = pg::provision().await else { return };
    let store = &db.store;
    let client = user(store, "c@x.com", Role::Client).await;
    let f1 = user(store, "f1@x.com", Role::Freelancer).await;
    let job_id = open_job(store, client).await;
    let app = store.create_application(f1, job_id, "first").await.unwrap();
    store.create_attachment(app.id, "cv.pdf", "applications/1/a.pdf").await.unwrap();

    assert_eq!(
        store.attachment_keys_for_user(client).await.unwrap(),
        vec!["applications/1/a.pdf".to_string()]
    );
    store.delete_user(client).await.unwrap();
    assert!(store.find_job(job_id).await.unwrap().is_none());
    assert!(store.find_application(app.id).await.unwrap().is_none());
    assert!(store.find_user(f1).await.unwrap().is_some());
}
