use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{
    auth::{jwt::JwtKeys, repo::UserRepo, repo_types::User},
    error::{AppError, AppResult},
    state::AppState,
    types::Role,
};

/// The authenticated user behind a request, as loaded from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub role: Role,
}

impl Caller {
    /// Forbids callers whose role is not `role`.
    pub fn require(&self, role: Role, message: &str) -> AppResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::forbidden(message))
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("Invalid Authorization header"))
}

/// Header -> claims -> stored user.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> AppResult<User> {
    let token = bearer_token(headers)?;
    let claims = JwtKeys::from(&state.config.jwt)
        .verify_access(token)
        .map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::unauthorized("Invalid or expired token")
        })?;
    state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))
}

fn ensure_not_banned(user: &User) -> AppResult<()> {
    if user.ban {
        warn!(user_id = user.id, "banned user rejected");
        return Err(AppError::forbidden("User is banned"));
    }
    Ok(())
}

fn ensure_admin(user: &User) -> AppResult<()> {
    if user.role != Role::Admin {
        warn!(user_id = user.id, role = %user.role, "non-admin on admin route");
        return Err(AppError::forbidden("Access denied: Admins only"));
    }
    Ok(())
}

pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, req.headers()).await?;
    ensure_not_banned(&user)?;
    req.extensions_mut().insert(Caller {
        id: user.id,
        role: user.role,
    });
    Ok(next.run(req).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, req.headers()).await?;
    ensure_admin(&user)?;
    req.extensions_mut().insert(Caller {
        id: user.id,
        role: user.role,
    });
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .copied()
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))
    }
}
