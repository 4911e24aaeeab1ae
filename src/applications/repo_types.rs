use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::{db::StoreError, jobs::repo_types::Job, types::ApplicationStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub id: i64,
    pub user_id: i64,
    pub job_id: i64,
    pub description: String,
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Attachment {
    pub id: i64,
    pub application_id: i64,
    pub file_name: String,
    #[serde(skip_serializing)]
    pub storage_key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A stored object to record against an application.
#[derive(Debug, Clone, Copy)]
pub struct NewAttachment<'a> {
    pub file_name: &'a str,
    pub storage_key: &'a str,
}

/// An edited pending application and the attachment row it replaced, whose
/// object is now unreferenced.
#[derive(Debug, Clone)]
pub struct Revision {
    pub application: Application,
    pub replaced: Option<Attachment>,
}

/// What an accept changed, for logging and responses.
#[derive(Debug, Clone)]
pub struct Acceptance {
    pub application: Application,
    pub job: Job,
    pub auto_rejected: Vec<i64>,
}

#[derive(Debug, FromRow)]
pub(crate) struct ApplicationRow {
    pub id: i64,
    pub user_id: i64,
    pub job_id: i64,
    pub description: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = StoreError;

    fn try_from(r: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            job_id: r.job_id,
            description: r.description,
            status: r.status.parse().map_err(StoreError::Corrupt)?,
            rejection_reason: r.rejection_reason,
            created_at: r.created_at,
        })
    }
}
