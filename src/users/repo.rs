use axum::async_trait;

use crate::{
    db::{PgStore, StoreResult},
    users::repo_types::{ClientData, ClientUpdate, FreelancerData, FreelancerRow, FreelancerUpdate},
};

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn freelancer_data(&self, user_id: i64) -> StoreResult<Option<FreelancerData>>;
    async fn client_data(&self, user_id: i64) -> StoreResult<Option<ClientData>>;
    /// `NotFound` when the user has no freelancer profile row.
    async fn update_freelancer_data(&self, user_id: i64, update: FreelancerUpdate) -> StoreResult<FreelancerData>;
    /// `NotFound` when the user has no client profile row.
    async fn update_client_data(&self, user_id: i64, update: ClientUpdate) -> StoreResult<ClientData>;
}

#[async_trait]
impl ProfileRepo for PgStore {
    async fn freelancer_data(&self, user_id: i64) -> StoreResult<Option<FreelancerData>> {
        let row = sqlx::query_as::<_, FreelancerRow>(
            r#"
            SELECT user_id, title, description, hourly_rate, hours_per_week
              FROM freelancer_data
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(FreelancerData::try_from).transpose()
    }

    async fn client_data(&self, user_id: i64) -> StoreResult<Option<ClientData>> {
        let row = sqlx::query_as::<_, ClientData>(
            r#"
            SELECT user_id, description, company_name, industry, location
              FROM client_data
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_freelancer_data(&self, user_id: i64, update: FreelancerUpdate) -> StoreResult<FreelancerData> {
        let row = sqlx::query_as::<_, FreelancerRow>(
            r#"
            UPDATE freelancer_data
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   hourly_rate = COALESCE($4, hourly_rate),
                   hours_per_week = COALESCE($5, hours_per_week)
             WHERE user_id = $1
            RETURNING user_id, title, description, hourly_rate, hours_per_week
            "#,
        )
        .bind(user_id)
        .bind(update.title)
        .bind(update.description)
        .bind(update.hourly_rate)
        .bind(update.hours_per_week.map(|h| h.as_str()))
        .fetch_one(&self.pool)
        .await?;
        FreelancerData::try_from(row)
    }

    async fn update_client_data(&self, user_id: i64, update: ClientUpdate) -> StoreResult<ClientData> {
        let row = sqlx::query_as::<_, ClientData>(
            r#"
            UPDATE client_data
               SET description = COALESCE($2, description),
                   company_name = COALESCE($3, company_name),
                   industry = COALESCE($4, industry),
                   location = COALESCE($5, location)
             WHERE user_id = $1
            RETURNING user_id, description, company_name, industry, location
            "#,
        )
        .bind(user_id)
        .bind(update.description)
        .bind(update.company_name)
        .bind(update.industry)
        .bind(update.location)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
