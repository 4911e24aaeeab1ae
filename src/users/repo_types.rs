use sqlx::FromRow;

use crate::{db::StoreError, types::HoursPerWeek};

#[derive(Debug, Clone, PartialEq)]
pub struct FreelancerData {
    pub user_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub hours_per_week: Option<HoursPerWeek>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ClientData {
    pub user_id: i64,
    pub description: Option<String>,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
}

/// `None` fields are left as stored.
#[derive(Debug, Clone, Default)]
pub struct FreelancerUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub hours_per_week: Option<HoursPerWeek>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub description: Option<String>,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, FromRow)]
pub(crate) struct FreelancerRow {
    pub user_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub hours_per_week: Option<String>,
}

impl TryFrom<FreelancerRow> for FreelancerData {
    type Error = StoreError;

    fn try_from(r: FreelancerRow) -> Result<Self, Self::Error> {
        let hours_per_week = r
            .hours_per_week
            .map(|h| h.parse::<HoursPerWeek>())
            .transpose()
            .map_err(StoreError::Corrupt)?;
        Ok(Self {
            user_id: r.user_id,
            title: r.title,
            description: r.description,
            hourly_rate: r.hourly_rate,
            hours_per_week,
        })
    }
}
