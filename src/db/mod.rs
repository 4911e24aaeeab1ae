use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    applications::repo::ApplicationRepo,
    auth::repo::{RefreshTokenRepo, UserRepo},
    config::AppConfig,
    jobs::repo::JobRepo,
    skills::repo::SkillRepo,
    users::repo::ProfileRepo,
};

mod memory;

pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A uniqueness rule rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The row changed between the caller's read and this write.
    #[error("stale state: {0}")]
    StaleState(String),

    /// A stored value no longer parses into its domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Everything the services need from persistence.
pub trait Store:
    UserRepo + RefreshTokenRepo + ProfileRepo + SkillRepo + JobRepo + ApplicationRepo + Send + Sync
{
}

impl<T> Store for T where
    T: UserRepo + RefreshTokenRepo + ProfileRepo + SkillRepo + JobRepo + ApplicationRepo + Send + Sync
{
}

/// Postgres-backed store; the repository impls live next to each domain module.
#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}
