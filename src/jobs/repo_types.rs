use sqlx::FromRow;
use time::OffsetDateTime;

use crate::{
    db::StoreError,
    types::{HoursPerWeek, JobStatus, JobType, ProjectLength, RateKind},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: i64,
    pub client_id: i64,
    /// Set only when an application is accepted.
    pub freelancer_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub job_type: JobType,
    pub rate: RateKind,
    /// Per hour when `rate` is hourly, total otherwise.
    pub amount: i64,
    pub length: ProjectLength,
    pub hours_per_week: HoursPerWeek,
    pub status: JobStatus,
    pub created_at: OffsetDateTime,
}

impl Job {
    pub fn is_open(&self) -> bool {
        self.status == JobStatus::Open
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub client_id: i64,
    pub title: String,
    pub description: String,
    pub job_type: JobType,
    pub rate: RateKind,
    pub amount: i64,
    pub length: ProjectLength,
    pub hours_per_week: HoursPerWeek,
}

#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub job_type: Option<JobType>,
    pub rate: Option<RateKind>,
    pub amount: Option<i64>,
    pub length: Option<ProjectLength>,
    pub hours_per_week: Option<HoursPerWeek>,
}

#[derive(Debug, FromRow)]
pub(crate) struct JobRow {
    pub id: i64,
    pub client_id: i64,
    pub freelancer_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub job_type: String,
    pub rate: String,
    pub amount: i64,
    pub length: String,
    pub hours_per_week: String,
    pub status: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(r: JobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            client_id: r.client_id,
            freelancer_id: r.freelancer_id,
            title: r.title,
            description: r.description,
            job_type: r.job_type.parse().map_err(StoreError::Corrupt)?,
            rate: r.rate.parse().map_err(StoreError::Corrupt)?,
            amount: r.amount,
            length: r.length.parse().map_err(StoreError::Corrupt)?,
            hours_per_week: r.hours_per_week.parse().map_err(StoreError::Corrupt)?,
            status: r.status.parse().map_err(StoreError::Corrupt)?,
            created_at: r.created_at,
        })
    }
}
