use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair},
        jwt::JwtKeys,
        password::{hash_password_async, verify_password_async},
        repo::{RefreshTokenRepo, UserRepo},
        repo_types::{NewUser, User},
    },
    config::AdminSeed,
    db::{Store, StoreError},
    error::{AppError, AppResult},
    types::Role,
};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn issue_pair(keys: &JwtKeys, user: &User) -> AppResult<TokenPair> {
    Ok(TokenPair {
        access_token: keys.sign_access(user.id, user.role)?,
        refresh_token: keys.sign_refresh(user.id, user.role)?,
    })
}

/// Creates a client or freelancer account together with its empty profile.
pub async fn register(store: &dyn Store, req: RegisterRequest) -> AppResult<User> {
    let email = normalize_email(&req.email);
    let role: Role = req.role.parse().map_err(AppError::Validation)?;

    if store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::conflict("User already exists"));
    }

    let password_hash = hash_password_async(req.password).await?;
    let user = store
        .create_user(NewUser {
            email,
            password_hash,
            name: req.name.trim().to_string(),
            surname: req.surname.trim().to_string(),
            role,
        })
        .await
        .map_err(|e| match e {
            // lost a race with a concurrent registration
            StoreError::Conflict(_) => AppError::conflict("User already exists"),
            other => other.into(),
        })?;

    info!(user_id = user.id, role = %user.role, "user registered");
    Ok(user)
}

/// Verifies credentials and starts a fresh session; earlier refresh tokens stop working.
pub async fn login(store: &dyn Store, keys: &JwtKeys, req: LoginRequest) -> AppResult<TokenPair> {
    let email = normalize_email(&req.email);
    let Some(user) = store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::unauthorized("Invalid email or password"));
    };

    if !verify_password_async(req.password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::unauthorized("Invalid email or password"));
    }

    let pair = issue_pair(keys, &user)?;
    store
        .replace_refresh_tokens(user.id, &pair.refresh_token)
        .await?;

    info!(user_id = user.id, "user logged in");
    Ok(pair)
}

/// Trades a stored refresh token for a new pair; the presented token is consumed.
pub async fn refresh(store: &dyn Store, keys: &JwtKeys, req: RefreshRequest) -> AppResult<TokenPair> {
    let claims = keys.verify_refresh(&req.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        AppError::unauthorized("Invalid refresh token")
    })?;

    let user = store
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid refresh token"))?;

    let pair = issue_pair(keys, &user)?;
    store
        .rotate_refresh_token(user.id, &req.refresh_token, &pair.refresh_token)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => {
                warn!(user_id = user.id, "refresh token not stored");
                AppError::unauthorized("Invalid refresh token")
            }
            other => other.into(),
        })?;

    info!(user_id = user.id, "tokens refreshed");
    Ok(pair)
}

pub async fn logout(store: &dyn Store, user_id: i64) -> AppResult<()> {
    store.delete_refresh_tokens(user_id).await?;
    info!(user_id, "user logged out");
    Ok(())
}

/// Creates the configured admin unless the email is already taken. Safe to
/// run on every start.
pub async fn seed_admin(store: &dyn Store, seed: &AdminSeed) -> anyhow::Result<()> {
    let email = normalize_email(&seed.email);
    if store.find_user_by_email(&email).await?.is_some() {
        return Ok(());
    }
    let password_hash = hash_password_async(seed.password.clone()).await?;
    let admin = store
        .create_user(NewUser {
            email,
            password_hash,
            name: seed.name.clone(),
            surname: seed.surname.clone(),
            role: Role::Admin,
        })
        .await?;
    info!(user_id = admin.id, "admin account seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::JwtConfig, db::MemoryStore};

    fn keys() -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: "unit".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    fn register_req(email: &str, role: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: "Passw0rd!".into(),
            role: role.into(),
            name: "Fay".into(),
            surname: "Lancer".into(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_and_adds_no_row() {
        let store = MemoryStore::default();
        register(&store, register_req("f@x.com", "freelancer")).await.unwrap();

        let err = register(&store, register_req("F@X.com ", "client")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn login_checks_password() {
        let store = MemoryStore::default();
        register(&store, register_req("f@x.com", "freelancer")).await.unwrap();

        let err = login(&store, &keys(), login_req("f@x.com", "Wrong0ne!")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = login(&store, &keys(), login_req("nobody@x.com", "Passw0rd!")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let pair = login(&store, &keys(), login_req("f@x.com", "Passw0rd!")).await.unwrap();
        let claims = keys().verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.role, Role::Freelancer);
    }

    #[tokio::test]
    async fn refresh_rotates_and_consumes_the_old_token() {
        let store = MemoryStore::default();
        register(&store, register_req("c@x.com", "client")).await.unwrap();
        let first = login(&store, &keys(), login_req("c@x.com", "Passw0rd!")).await.unwrap();

        let second = refresh(
            &store,
            &keys(),
            RefreshRequest {
                refresh_token: first.refresh_token.clone(),
            },
        )
        .await
        .unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        let err = refresh(
            &store,
            &keys(),
            RefreshRequest {
                refresh_token: first.refresh_token,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn new_login_invalidates_previous_session() {
        let store = MemoryStore::default();
        register(&store, register_req("c@x.com", "client")).await.unwrap();
        let first = login(&store, &keys(), login_req("c@x.com", "Passw0rd!")).await.unwrap();
        let _second = login(&store, &keys(), login_req("c@x.com", "Passw0rd!")).await.unwrap();

        let res = refresh(
            &store,
            &keys(),
            RefreshRequest {
                refresh_token: first.refresh_token,
            },
        )
        .await;
        assert!(matches!(res, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn logout_drops_refresh_tokens() {
        let store = MemoryStore::default();
        let user = register(&store, register_req("c@x.com", "client")).await.unwrap();
        let pair = login(&store, &keys(), login_req("c@x.com", "Passw0rd!")).await.unwrap();
        logout(&store, user.id).await.unwrap();

        let res = refresh(
            &store,
            &keys(),
            RefreshRequest {
                refresh_token: pair.refresh_token,
            },
        )
        .await;
        assert!(matches!(res, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn admin_seed_is_idempotent() {
        let store = MemoryStore::default();
        let seed = AdminSeed {
            email: "admin@x.com".into(),
            password: "Adm1nPass".into(),
            name: "Ada".into(),
            surname: "Min".into(),
        };
        seed_admin(&store, &seed).await.unwrap();
        seed_admin(&store, &seed).await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
    }
}
