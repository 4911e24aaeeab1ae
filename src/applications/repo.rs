use axum::async_trait;

use crate::{
    applications::repo_types::{Acceptance, Application, ApplicationRow, Attachment, NewAttachment, Revision},
    db::{PgStore, StoreError, StoreResult},
    jobs::{
        repo::JOB_COLUMNS,
        repo_types::{Job, JobRow},
    },
    types::{ApplicationStatus, JobStatus},
};

const APPLICATION_COLUMNS: &str =
    "id, user_id, job_id, description, status, rejection_reason, created_at";

#[async_trait]
pub trait ApplicationRepo: Send + Sync {
    /// Inserts a pending application while the job is open. `StaleState` when
    /// the job is not open, `Conflict` when the user already applied.
    async fn create_application(&self, user_id: i64, job_id: i64, description: &str) -> StoreResult<Application>;
    async fn find_application(&self, id: i64) -> StoreResult<Option<Application>>;
    async fn find_application_for(&self, user_id: i64, job_id: i64) -> StoreResult<Option<Application>>;
    async fn list_applications_by_user(&self, user_id: i64) -> StoreResult<Vec<Application>>;
    async fn list_applications_by_job(&self, job_id: i64) -> StoreResult<Vec<Application>>;
    async fn count_applications_by_job(&self, job_id: i64) -> StoreResult<i64>;
    /// Edits a pending application in one unit. With `attachment`, any
    /// previous attachment row is swapped for the new one and returned in
    /// `Revision::replaced`. `StaleState` and no writes unless still pending.
    async fn update_pending_application(
        &self,
        id: i64,
        description: Option<String>,
        attachment: Option<NewAttachment<'_>>,
    ) -> StoreResult<Revision>;
    /// `StaleState` unless the application is still pending.
    async fn delete_pending_application(&self, id: i64) -> StoreResult<()>;
    /// Pending -> rejected while the job is open.
    async fn reject_application(&self, id: i64, reason: &str) -> StoreResult<Application>;
    /// Pending -> accepted in one unit: sibling pending applications are
    /// rejected with `sibling_reason` and the job moves to in-progress with
    /// the applicant assigned. `StaleState` and no writes if the job is no
    /// longer open or the application no longer pending.
    async fn accept_application(&self, id: i64, sibling_reason: &str) -> StoreResult<Acceptance>;

    async fn find_attachment(&self, id: i64) -> StoreResult<Option<Attachment>>;
    async fn attachment_for_application(&self, application_id: i64) -> StoreResult<Option<Attachment>>;
    async fn create_attachment(&self, application_id: i64, file_name: &str, storage_key: &str) -> StoreResult<Attachment>;
    /// Keys of every attachment on applications to the job.
    async fn attachment_keys_for_job(&self, job_id: i64) -> StoreResult<Vec<String>>;
    /// Keys of attachments that disappear with the user: their own
    /// applications and applications to jobs they posted.
    async fn attachment_keys_for_user(&self, user_id: i64) -> StoreResult<Vec<String>>;
}

impl PgStore {
    async fn application_status(&self, id: i64) -> StoreResult<Option<String>> {
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(status)
    }

    async fn stale_or_missing(&self, id: i64, what: &str) -> StoreError {
        match self.application_status(id).await {
            Ok(Some(_)) => StoreError::StaleState(what.to_string()),
            Ok(None) => StoreError::NotFound,
            Err(e) => e,
        }
    }
}

#[async_trait]
impl ApplicationRepo for PgStore {
    async fn create_application(&self, user_id: i64, job_id: i64, description: &str) -> StoreResult<Application> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            INSERT INTO applications (user_id, job_id, description)
            SELECT $1, $2, $3
             WHERE EXISTS (SELECT 1 FROM jobs WHERE id = $2 AND status = 'open')
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(job_id)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Application::try_from(row),
            None => Err(StoreError::StaleState("job is not open".into())),
        }
    }

    async fn find_application(&self, id: i64) -> StoreResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Application::try_from).transpose()
    }

    async fn find_application_for(&self, user_id: i64, job_id: i64) -> StoreResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE user_id = $1 AND job_id = $2"
        ))
        .bind(user_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Application::try_from).transpose()
    }

    async fn list_applications_by_user(&self, user_id: i64) -> StoreResult<Vec<Application>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Application::try_from).collect()
    }

    async fn list_applications_by_job(&self, job_id: i64) -> StoreResult<Vec<Application>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE job_id = $1 ORDER BY created_at, id"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Application::try_from).collect()
    }

    async fn count_applications_by_job(&self, job_id: i64) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM applications WHERE job_id = $1")
            .bind(job_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_pending_application(
        &self,
        id: i64,
        description: Option<String>,
        attachment: Option<NewAttachment<'_>>,
    ) -> StoreResult<Revision> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            UPDATE applications
               SET description = COALESCE($2, description)
             WHERE id = $1 AND status = 'pending'
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(description)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Err(self.stale_or_missing(id, "application is no longer pending").await);
        };

        let mut replaced = None;
        if let Some(new) = attachment {
            replaced = sqlx::query_as::<_, Attachment>(
                r#"
                DELETE FROM attachments
                 WHERE application_id = $1
                RETURNING id, application_id, file_name, storage_key, created_at
                "#,
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
            sqlx::query("INSERT INTO attachments (application_id, file_name, storage_key) VALUES ($1, $2, $3)")
                .bind(id)
                .bind(new.file_name)
                .bind(new.storage_key)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Revision {
            application: Application::try_from(row)?,
            replaced,
        })
    }

    async fn delete_pending_application(&self, id: i64) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM applications WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(self.stale_or_missing(id, "application is no longer pending").await);
        }
        Ok(())
    }

    async fn reject_application(&self, id: i64, reason: &str) -> StoreResult<Application> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            UPDATE applications a
               SET status = 'rejected', rejection_reason = $2
             WHERE a.id = $1
               AND a.status = 'pending'
               AND EXISTS (SELECT 1 FROM jobs j WHERE j.id = a.job_id AND j.status = 'open')
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Application::try_from(row),
            None => Err(self.stale_or_missing(id, "application can no longer be rejected").await),
        }
    }

    async fn accept_application(&self, id: i64, sibling_reason: &str) -> StoreResult<Acceptance> {
        let mut tx = self.pool.begin().await?;

        let job_id = sqlx::query_scalar::<_, i64>("SELECT job_id FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;

        // Row lock on the job serializes concurrent accepts for it.
        let job_status = sqlx::query_scalar::<_, String>("SELECT status FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(job_id)
            .fetch_one(&mut *tx)
            .await?;
        if job_status != JobStatus::Open.as_str() {
            return Err(StoreError::StaleState("job is no longer open".into()));
        }

        let app_status = sqlx::query_scalar::<_, String>("SELECT status FROM applications WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if app_status != ApplicationStatus::Pending.as_str() {
            return Err(StoreError::StaleState("application is no longer pending".into()));
        }

        let auto_rejected = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE applications
               SET status = 'rejected', rejection_reason = $3
             WHERE job_id = $1 AND id <> $2 AND status = 'pending'
            RETURNING id
            "#,
        )
        .bind(job_id)
        .bind(id)
        .bind(sibling_reason)
        .fetch_all(&mut *tx)
        .await?;

        let app_row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            UPDATE applications
               SET status = 'accepted', rejection_reason = NULL
             WHERE id = $1
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let job_row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs
               SET freelancer_id = $2, status = 'in-progress'
             WHERE id = $1
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job_id)
        .bind(app_row.user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Acceptance {
            application: Application::try_from(app_row)?,
            job: Job::try_from(job_row)?,
            auto_rejected,
        })
    }

    async fn find_attachment(&self, id: i64) -> StoreResult<Option<Attachment>> {
        let row = sqlx::query_as::<_, Attachment>(
            "SELECT id, application_id, file_name, storage_key, created_at FROM attachments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn attachment_for_application(&self, application_id: i64) -> StoreResult<Option<Attachment>> {
        let row = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, application_id, file_name, storage_key, created_at
              FROM attachments
             WHERE application_id = $1
            "#,
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_attachment(&self, application_id: i64, file_name: &str, storage_key: &str) -> StoreResult<Attachment> {
        let row = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (application_id, file_name, storage_key)
            VALUES ($1, $2, $3)
            RETURNING id, application_id, file_name, storage_key, created_at
            "#,
        )
        .bind(application_id)
        .bind(file_name)
        .bind(storage_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn attachment_keys_for_job(&self, job_id: i64) -> StoreResult<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT at.storage_key
              FROM attachments at
              JOIN applications a ON a.id = at.application_id
             WHERE a.job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    async fn attachment_keys_for_user(&self, user_id: i64) -> StoreResult<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT at.storage_key
              FROM attachments at
              JOIN applications a ON a.id = at.application_id
              JOIN jobs j ON j.id = a.job_id
             WHERE a.user_id = $1 OR j.client_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }
}
