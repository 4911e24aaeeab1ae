use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::{Validate, ValidationError};

use crate::{
    applications::repo_types::{Application, Attachment},
    types::ApplicationStatus,
    validation::{fail, non_blank},
};

fn file_pair(name: &Option<String>, body: &Option<String>) -> Result<(), ValidationError> {
    match (name, body) {
        (Some(_), None) | (None, Some(_)) => Err(fail(
            "file",
            "File name and file content must be provided together",
        )),
        _ => Ok(()),
    }
}

fn decision(value: &str) -> Result<(), ValidationError> {
    match value.parse::<ApplicationStatus>() {
        Ok(ApplicationStatus::Accepted | ApplicationStatus::Rejected) => Ok(()),
        _ => Err(fail("status", "Status must be accepted or rejected")),
    }
}

fn description_given(value: &str) -> Result<(), ValidationError> {
    non_blank(value, "Description is required and cannot be longer than 1000 symbols")
}

fn description_kept(value: &str) -> Result<(), ValidationError> {
    non_blank(value, "Description cannot be empty or longer than 1000 symbols")
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "submit_file_pair"))]
pub struct SubmitApplicationRequest {
    #[validate(
        required(message = "Missing required fields: job_id"),
        range(min = 1, message = "Invalid job id")
    )]
    pub job_id: Option<i64>,
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
    #[validate(custom(function = "crate::validation::pdf_file_name"))]
    pub file_name: Option<String>,
    pub file_base64: Option<String>,
}

fn submit_file_pair(req: &SubmitApplicationRequest) -> Result<(), ValidationError> {
    file_pair(&req.file_name, &req.file_base64)
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "update_file_pair"))]
pub struct UpdateApplicationRequest {
    #[validate(
        length(
            min = 1,
            max = 1000,
            message = "Description cannot be empty or longer than 1000 symbols"
        ),
        custom(function = "description_kept")
    )]
    pub description: Option<String>,
    #[validate(custom(function = "crate::validation::pdf_file_name"))]
    pub file_name: Option<String>,
    pub file_base64: Option<String>,
}

fn update_file_pair(req: &UpdateApplicationRequest) -> Result<(), ValidationError> {
    file_pair(&req.file_name, &req.file_base64)
}

/// A client's decision on a pending application.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangeStatusRequest {
    #[serde(default)]
    #[validate(custom(function = "decision"))]
    pub status: String,
    #[validate(length(max = 1000, message = "Rejection reason cannot be longer than 1000 symbols"))]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub id: i64,
    pub user_id: i64,
    pub job_id: i64,
    pub description: String,
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub attachment: Option<Attachment>,
}

impl ApplicationView {
    pub fn new(app: Application, attachment: Option<Attachment>) -> Self {
        Self {
            id: app.id,
            user_id: app.user_id,
            job_id: app.job_id,
            description: app.description,
            status: app.status,
            rejection_reason: app.rejection_reason,
            created_at: app.created_at,
            attachment,
        }
    }
}
