use axum::async_trait;

use crate::{
    auth::repo_types::{NewUser, User, UserRow, UserUpdate},
    db::{PgStore, StoreError, StoreResult},
    types::Role,
};

const USER_COLUMNS: &str = "id, email, password_hash, name, surname, role, ban, created_at";

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Inserts the user together with the profile row its role needs.
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>>;
    async fn update_user(&self, id: i64, update: UserUpdate) -> StoreResult<User>;
    /// Admin change of role and ban flag. A client or freelancer role gets its
    /// profile row created if it does not exist yet.
    async fn set_role_and_ban(&self, id: i64, role: Option<Role>, ban: Option<bool>) -> StoreResult<User>;
    async fn delete_user(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    /// Drops every stored token of the user and keeps only `token`.
    async fn replace_refresh_tokens(&self, user_id: i64, token: &str) -> StoreResult<()>;
    /// Swaps `old` for `new`; `NotFound` when `old` is not stored for the user.
    async fn rotate_refresh_token(&self, user_id: i64, old: &str, new: &str) -> StoreResult<()>;
    async fn delete_refresh_tokens(&self, user_id: i64) -> StoreResult<()>;
}

async fn ensure_profile_row(
    conn: &mut sqlx::PgConnection,
    user_id: i64,
    role: Role,
) -> StoreResult<()> {
    let sql = match role {
        Role::Freelancer => "INSERT INTO freelancer_data (user_id) VALUES ($1) ON CONFLICT DO NOTHING",
        Role::Client => "INSERT INTO client_data (user_id) VALUES ($1) ON CONFLICT DO NOTHING",
        Role::Admin => return Ok(()),
    };
    sqlx::query(sql).bind(user_id).execute(conn).await?;
    Ok(())
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, surname, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(&new.surname)
        .bind(new.role.as_str())
        .fetch_one(&mut *tx)
        .await?;
        ensure_profile_row(&mut tx, row.id, new.role).await?;
        tx.commit().await?;
        User::try_from(row)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY id"
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET email = COALESCE($2, email),
                   name = COALESCE($3, name),
                   surname = COALESCE($4, surname),
                   password_hash = COALESCE($5, password_hash)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.email)
        .bind(update.name)
        .bind(update.surname)
        .bind(update.password_hash)
        .fetch_one(&self.pool)
        .await?;
        User::try_from(row)
    }

    async fn set_role_and_ban(&self, id: i64, role: Option<Role>, ban: Option<bool>) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET role = COALESCE($2, role),
                   ban = COALESCE($3, ban)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(role.map(Role::as_str))
        .bind(ban)
        .fetch_one(&mut *tx)
        .await?;
        if let Some(role) = role {
            ensure_profile_row(&mut tx, id, role).await?;
        }
        tx.commit().await?;
        User::try_from(row)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepo for PgStore {
    async fn replace_refresh_tokens(&self, user_id: i64, token: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO refresh_tokens (user_id, token) VALUES ($1, $2)")
            .bind(user_id)
            .bind(token)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn rotate_refresh_token(&self, user_id: i64, old: &str, new: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(old)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        sqlx::query("INSERT INTO refresh_tokens (user_id, token) VALUES ($1, $2)")
            .bind(user_id)
            .bind(new)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_refresh_tokens(&self, user_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
