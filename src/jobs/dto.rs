use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::{Validate, ValidationError};

use crate::{
    applications::dto::ApplicationView,
    jobs::repo_types::Job,
    skills::repo_types::Skill,
    types::{HoursPerWeek, JobStatus, JobType, ProjectLength, RateKind},
    validation::{fail, non_blank},
};

/// Highest hourly amount a job may offer.
pub const MAX_HOURLY_AMOUNT: i64 = 1000;

pub(crate) fn hourly_cap(rate: RateKind, amount: i64) -> Result<(), ValidationError> {
    if rate == RateKind::Hourly && amount > MAX_HOURLY_AMOUNT {
        return Err(fail("amount", "Hourly rate cannot be more than 1000"));
    }
    Ok(())
}

fn title_given(value: &str) -> Result<(), ValidationError> {
    non_blank(value, "Title is required and cannot be longer than 30 symbols")
}

fn description_given(value: &str) -> Result<(), ValidationError> {
    non_blank(value, "Description is required and cannot be longer than 1000 symbols")
}

fn title_kept(value: &str) -> Result<(), ValidationError> {
    non_blank(value, "Title cannot be empty or longer than 30 symbols")
}

fn description_kept(value: &str) -> Result<(), ValidationError> {
    non_blank(value, "Description cannot be empty or longer than 1000 symbols")
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "create_hourly_cap"))]
pub struct CreateJobRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 30, message = "Title is required and cannot be longer than 30 symbols"),
        custom(function = "title_given")
    )]
    pub title: String,
    #[serde(default)]
    #[validate(
        length(
            min = 1,
            max = 1000,
            message = "Description is required and cannot be longer than 1000 symbols"
        ),
        custom(function = "description_given")
    )]
    pub description: String,
    #[serde(default, rename = "type")]
    #[validate(custom(function = "crate::validation::job_type"))]
    pub job_type: String,
    #[serde(default)]
    #[validate(custom(function = "crate::validation::rate_kind"))]
    pub rate: String,
    #[validate(
        required(message = "Missing required fields: amount"),
        range(min = 1, message = "Amount must be a positive number")
    )]
    pub amount: Option<i64>,
    #[serde(default)]
    #[validate(custom(function = "crate::validation::project_length"))]
    pub length: String,
    #[serde(default)]
    #[validate(custom(function = "crate::validation::hours_per_week"))]
    pub hours_per_week: String,
    pub skills: Option<Vec<i64>>,
}

fn create_hourly_cap(req: &CreateJobRequest) -> Result<(), ValidationError> {
    match (req.rate.parse::<RateKind>(), req.amount) {
        (Ok(rate), Some(amount)) => hourly_cap(rate, amount),
        _ => Ok(()),
    }
}

/// Partial update; the hourly cap is checked against the merged job.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateJobRequest {
    #[validate(
        length(min = 1, max = 30, message = "Title cannot be empty or longer than 30 symbols"),
        custom(function = "title_kept")
    )]
    pub title: Option<String>,
    #[validate(
        length(
            min = 1,
            max = 1000,
            message = "Description cannot be empty or longer than 1000 symbols"
        ),
        custom(function = "description_kept")
    )]
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[validate(custom(function = "crate::validation::job_type"))]
    pub job_type: Option<String>,
    #[validate(custom(function = "crate::validation::rate_kind"))]
    pub rate: Option<String>,
    #[validate(range(min = 1, message = "Amount must be a positive number"))]
    pub amount: Option<i64>,
    #[validate(custom(function = "crate::validation::project_length"))]
    pub length: Option<String>,
    #[validate(custom(function = "crate::validation::hours_per_week"))]
    pub hours_per_week: Option<String>,
    pub skills: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: i64,
    pub client_id: i64,
    pub freelancer_id: Option<i64>,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub rate: RateKind,
    pub amount: i64,
    pub length: ProjectLength,
    pub hours_per_week: HoursPerWeek,
    pub status: JobStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub skills: Vec<Skill>,
    /// The caller's own application to this job, for freelancers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<i64>,
}

impl JobView {
    pub fn new(job: Job, skills: Vec<Skill>, application_id: Option<i64>) -> Self {
        Self {
            id: job.id,
            client_id: job.client_id,
            freelancer_id: job.freelancer_id,
            title: job.title,
            description: job.description,
            job_type: job.job_type,
            rate: job.rate,
            amount: job.amount,
            length: job.length,
            hours_per_week: job.hours_per_week,
            status: job.status,
            created_at: job.created_at,
            skills,
            application_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientJobView {
    #[serde(flatten)]
    pub job: JobView,
    pub application_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ClientJobDetail {
    #[serde(flatten)]
    pub job: JobView,
    pub applications: Vec<ApplicationView>,
}
