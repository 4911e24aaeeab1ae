use std::env;

use lazy_static::lazy_static;
use marketplace::db::PgStore;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::{Mutex, MutexGuard};

lazy_static! {
    // every test truncates the same tables
    static ref SERIAL: Mutex<()> = Mutex::new(());
}

/// A migrated, empty database. Tests holding one run one at a time.
pub struct PgHarness {
    pub store: PgStore,
    _serial: MutexGuard<'static, ()>,
}

/// Connects to `TEST_DATABASE_URL`. `None` when it is unset, so the suite
/// still runs on machines without Postgres.
pub async fn provision() -> Option<PgHarness> {
    let Ok(url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping postgres test");
        return None;
    };
    let serial = SERIAL.lock().await;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to postgres for integration tests");
    let store = PgStore { pool };
    store
        .migrate()
        .await
        .expect("failed to migrate the test database");
    reset_tables(&store).await;

    Some(PgHarness {
        store,
        _serial: serial,
    })
}

pub async fn reset_tables(store: &PgStore) {
    sqlx::query(
        "TRUNCATE TABLE attachments, applications, job_skills, jobs, freelancer_skills, skills, \
         freelancer_data, client_data, refresh_tokens, users RESTART IDENTITY CASCADE",
    )
    .execute(&store.pool)
    .await
    .expect("failed to truncate tables for test isolation");
}
