use axum::async_trait;

use crate::{
    db::{PgStore, StoreError, StoreResult},
    skills::repo_types::Skill,
};

#[async_trait]
pub trait SkillRepo: Send + Sync {
    async fn list_skills(&self) -> StoreResult<Vec<Skill>>;
    async fn find_skill(&self, id: i64) -> StoreResult<Option<Skill>>;
    /// Skills among `ids` that exist, in id order.
    async fn find_skills(&self, ids: &[i64]) -> StoreResult<Vec<Skill>>;
    async fn create_skill(&self, name: &str) -> StoreResult<Skill>;
    async fn rename_skill(&self, id: i64, name: &str) -> StoreResult<Skill>;
    async fn delete_skill(&self, id: i64) -> StoreResult<()>;
    async fn freelancer_skills(&self, user_id: i64) -> StoreResult<Vec<Skill>>;
    /// `false` when the link already existed.
    async fn add_freelancer_skill(&self, user_id: i64, skill_id: i64) -> StoreResult<bool>;
    /// `false` when there was no link to remove.
    async fn remove_freelancer_skill(&self, user_id: i64, skill_id: i64) -> StoreResult<bool>;
}

#[async_trait]
impl SkillRepo for PgStore {
    async fn list_skills(&self) -> StoreResult<Vec<Skill>> {
        let rows = sqlx::query_as::<_, Skill>("SELECT id, name FROM skills ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_skill(&self, id: i64) -> StoreResult<Option<Skill>> {
        let row = sqlx::query_as::<_, Skill>("SELECT id, name FROM skills WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_skills(&self, ids: &[i64]) -> StoreResult<Vec<Skill>> {
        let rows = sqlx::query_as::<_, Skill>(
            "SELECT id, name FROM skills WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_skill(&self, name: &str) -> StoreResult<Skill> {
        let row = sqlx::query_as::<_, Skill>(
            "INSERT INTO skills (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn rename_skill(&self, id: i64, name: &str) -> StoreResult<Skill> {
        let row = sqlx::query_as::<_, Skill>(
            "UPDATE skills SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_skill(&self, id: i64) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM skills WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn freelancer_skills(&self, user_id: i64) -> StoreResult<Vec<Skill>> {
        let rows = sqlx::query_as::<_, Skill>(
            r#"
            SELECT s.id, s.name
              FROM skills s
              JOIN freelancer_skills fs ON fs.skill_id = s.id
             WHERE fs.user_id = $1
             ORDER BY s.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn add_freelancer_skill(&self, user_id: i64, skill_id: i64) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO freelancer_skills (user_id, skill_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(skill_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn remove_freelancer_skill(&self, user_id: i64, skill_id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM freelancer_skills WHERE user_id = $1 AND skill_id = $2")
            .bind(user_id)
            .bind(skill_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}
