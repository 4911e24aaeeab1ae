use axum::async_trait;
use sqlx::PgConnection;

use crate::{
    db::{PgStore, StoreError, StoreResult},
    jobs::repo_types::{Job, JobRow, JobUpdate, NewJob},
    skills::repo_types::Skill,
    types::JobStatus,
};

pub(crate) const JOB_COLUMNS: &str = "id, client_id, freelancer_id, title, description, job_type, \
     rate, amount, length, hours_per_week, status, created_at";

#[async_trait]
pub trait JobRepo: Send + Sync {
    async fn create_job(&self, new: NewJob, skill_ids: &[i64]) -> StoreResult<Job>;
    async fn find_job(&self, id: i64) -> StoreResult<Option<Job>>;
    async fn list_jobs_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>>;
    async fn list_jobs_by_client(&self, client_id: i64) -> StoreResult<Vec<Job>>;
    async fn list_jobs_by_freelancer(&self, freelancer_id: i64) -> StoreResult<Vec<Job>>;
    /// Applies only while the job is open; `StaleState` otherwise.
    /// `skill_ids` replaces the skill set when given.
    async fn update_open_job(&self, id: i64, update: JobUpdate, skill_ids: Option<&[i64]>) -> StoreResult<Job>;
    /// Removes the job only while it is open; `StaleState` otherwise.
    async fn delete_open_job(&self, id: i64) -> StoreResult<()>;
    async fn delete_job(&self, id: i64) -> StoreResult<()>;
    async fn job_skills(&self, job_id: i64) -> StoreResult<Vec<Skill>>;
}

async fn replace_job_skills(conn: &mut PgConnection, job_id: i64, skill_ids: &[i64]) -> StoreResult<()> {
    sqlx::query("DELETE FROM job_skills WHERE job_id = $1")
        .bind(job_id)
        .execute(&mut *conn)
        .await?;
    if !skill_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO job_skills (job_id, skill_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(job_id)
        .bind(skill_ids.to_vec())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

impl PgStore {
    async fn jobs_where(&self, clause: &str, id: i64) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE {clause} ORDER BY created_at DESC, id DESC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    async fn job_status(&self, id: i64) -> StoreResult<Option<String>> {
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(status)
    }
}

#[async_trait]
impl JobRepo for PgStore {
    async fn create_job(&self, new: NewJob, skill_ids: &[i64]) -> StoreResult<Job> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            INSERT INTO jobs (client_id, title, description, job_type, rate, amount, length, hours_per_week)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(new.client_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.job_type.as_str())
        .bind(new.rate.as_str())
        .bind(new.amount)
        .bind(new.length.as_str())
        .bind(new.hours_per_week.as_str())
        .fetch_one(&mut *tx)
        .await?;
        replace_job_skills(&mut tx, row.id, skill_ids).await?;
        tx.commit().await?;
        Job::try_from(row)
    }

    async fn find_job(&self, id: i64) -> StoreResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Job::try_from).transpose()
    }

    async fn list_jobs_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE status = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    async fn list_jobs_by_client(&self, client_id: i64) -> StoreResult<Vec<Job>> {
        self.jobs_where("client_id = $1", client_id).await
    }

    async fn list_jobs_by_freelancer(&self, freelancer_id: i64) -> StoreResult<Vec<Job>> {
        self.jobs_where("freelancer_id = $1", freelancer_id).await
    }

    async fn update_open_job(&self, id: i64, update: JobUpdate, skill_ids: Option<&[i64]>) -> StoreResult<Job> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   job_type = COALESCE($4, job_type),
                   rate = COALESCE($5, rate),
                   amount = COALESCE($6, amount),
                   length = COALESCE($7, length),
                   hours_per_week = COALESCE($8, hours_per_week)
             WHERE id = $1 AND status = 'open'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.title)
        .bind(update.description)
        .bind(update.job_type.map(|v| v.as_str()))
        .bind(update.rate.map(|v| v.as_str()))
        .bind(update.amount)
        .bind(update.length.map(|v| v.as_str()))
        .bind(update.hours_per_week.map(|v| v.as_str()))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            drop(tx);
            return match self.job_status(id).await? {
                Some(_) => Err(StoreError::StaleState("job is no longer open".into())),
                None => Err(StoreError::NotFound),
            };
        };
        if let Some(ids) = skill_ids {
            replace_job_skills(&mut tx, id, ids).await?;
        }
        tx.commit().await?;
        Job::try_from(row)
    }

    async fn delete_open_job(&self, id: i64) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM jobs WHERE id = $1 AND status = 'open'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return match self.job_status(id).await? {
                Some(_) => Err(StoreError::StaleState("job is no longer open".into())),
                None => Err(StoreError::NotFound),
            };
        }
        Ok(())
    }

    async fn delete_job(&self, id: i64) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn job_skills(&self, job_id: i64) -> StoreResult<Vec<Skill>> {
        let rows = sqlx::query_as::<_, Skill>(
            r#"
            SELECT s.id, s.name
              FROM skills s
              JOIN job_skills js ON js.skill_id = s.id
             WHERE js.job_id = $1
             ORDER BY s.name
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
