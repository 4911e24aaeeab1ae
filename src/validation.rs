//! Field rules shared by the request DTOs. Each function plugs into
//! `#[validate(custom(function = "..."))]` and carries its own client-facing
//! message.

use std::{borrow::Cow, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

use crate::types::{HoursPerWeek, JobType, ProjectLength, RateKind, Role};

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

const COMMON_PASSWORDS: &[&str] = &[
    "password1",
    "password12",
    "password123",
    "passw0rd",
    "qwerty123",
    "qwerty1234",
    "welcome1",
    "welcome123",
    "letmein1",
    "abc12345",
    "abcd1234",
    "admin123",
    "iloveyou1",
    "sunshine1",
    "football1",
    "monkey123",
    "dragon123",
    "trustno1",
    "changeme1",
    "123456789a",
];

pub(crate) fn fail(code: &'static str, message: impl Into<String>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message.into()));
    err
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn email(value: &str) -> Result<(), ValidationError> {
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(fail("email", "Invalid email format"))
    }
}

pub fn password(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < 8 {
        return Err(fail("password", "Password must contain at least 8 characters"));
    }
    if len > 20 {
        return Err(fail("password", "Password must not exceed 20 characters"));
    }
    if COMMON_PASSWORDS.contains(&value.to_lowercase().as_str()) {
        return Err(fail(
            "password",
            "Password cannot be common, please choose something unique",
        ));
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return Err(fail("password", "Password must contain at least one number"));
    }
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(fail(
            "password",
            "Password must contain at least one uppercase letter",
        ));
    }
    if !value.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(fail(
            "password",
            "Password must contain at least one lowercase letter",
        ));
    }
    Ok(())
}

/// Roles a user may pick for themselves. Admins are only created by seeding
/// or promotion.
pub fn signup_role(value: &str) -> Result<(), ValidationError> {
    match Role::from_str(value) {
        Ok(Role::Client | Role::Freelancer) => Ok(()),
        _ => Err(fail(
            "role",
            format!(
                "Invalid role: {}. Role must be either 'client' or 'freelancer'",
                value
            ),
        )),
    }
}

pub fn any_role(value: &str) -> Result<(), ValidationError> {
    Role::from_str(value).map(|_| ()).map_err(|_| {
        fail(
            "role",
            format!(
                "Invalid role: {}. Role must be 'client', 'freelancer' or 'admin'",
                value
            ),
        )
    })
}

fn one_of<T: FromStr<Err = String>>(code: &'static str, value: &str) -> Result<(), ValidationError> {
    T::from_str(value).map(|_| ()).map_err(|msg| fail(code, msg))
}

pub fn job_type(value: &str) -> Result<(), ValidationError> {
    one_of::<JobType>("type", value)
}

pub fn rate_kind(value: &str) -> Result<(), ValidationError> {
    one_of::<RateKind>("rate", value)
}

pub fn project_length(value: &str) -> Result<(), ValidationError> {
    one_of::<ProjectLength>("length", value)
}

pub fn hours_per_week(value: &str) -> Result<(), ValidationError> {
    one_of::<HoursPerWeek>("hours_per_week", value)
}

pub fn pdf_file_name(value: &str) -> Result<(), ValidationError> {
    if value.to_lowercase().ends_with(".pdf") && value.len() > 4 {
        Ok(())
    } else {
        Err(fail("file_name", "File must be a PDF"))
    }
}

/// Text that is empty once trimmed counts as missing.
pub(crate) fn non_blank(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(fail("blank", message))
    } else {
        Ok(())
    }
}
