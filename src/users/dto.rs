use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::{Validate, ValidationError};

use crate::{
    skills::repo_types::Skill,
    types::{HoursPerWeek, Role},
    validation::fail,
};

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "password_pair"))]
pub struct UpdateUserRequest {
    #[validate(custom(function = "crate::validation::email"))]
    pub email: Option<String>,
    #[validate(length(max = 30, message = "Name cannot be longer than 30 symbols"))]
    pub name: Option<String>,
    #[validate(length(max = 30, message = "Surname cannot be longer than 30 symbols"))]
    pub surname: Option<String>,
    /// Current password, required to set `new_password`.
    pub password: Option<String>,
    #[validate(custom(function = "crate::validation::password"))]
    pub new_password: Option<String>,
}

fn password_pair(req: &UpdateUserRequest) -> Result<(), ValidationError> {
    match (&req.password, &req.new_password) {
        (Some(_), None) => Err(fail("new_password", "Missing new password")),
        (None, Some(_)) => Err(fail("password", "Missing old password")),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFreelancerRequest {
    #[validate(length(max = 30, message = "Title cannot be longer than 30 symbols"))]
    pub title: Option<String>,
    #[validate(length(max = 1000, message = "Description cannot be longer than 1000 symbols"))]
    pub description: Option<String>,
    #[validate(range(min = 1.0, max = 1000.0, message = "Hourly rate must be between 1 and 1000"))]
    pub hourly_rate: Option<f64>,
    #[validate(custom(function = "crate::validation::hours_per_week"))]
    pub hours_per_week: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(max = 1000, message = "Description cannot be longer than 1000 symbols"))]
    pub description: Option<String>,
    #[validate(length(max = 30, message = "Company name cannot be more than 30 symbols"))]
    pub company_name: Option<String>,
    #[validate(length(max = 30, message = "Industry cannot be more than 30 symbols"))]
    pub industry: Option<String>,
    #[validate(length(max = 30, message = "Location cannot be more than 30 symbols"))]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(custom(function = "crate::validation::any_role"))]
    pub role: Option<String>,
    pub ban: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FreelancerProfile {
    pub title: Option<String>,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub hours_per_week: Option<HoursPerWeek>,
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientProfile {
    pub description: Option<String>,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
}

/// Role-specific part of a user, chosen once when the view is built.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProfileData {
    Freelancer(FreelancerProfile),
    Client(ClientProfile),
    None,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub role: Role,
    pub profile: ProfileData,
}

#[derive(Debug, Serialize)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub user: UserView,
    pub ban: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct FreelancerSummary {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub title: Option<String>,
    pub hourly_rate: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ClientSummary {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
}
