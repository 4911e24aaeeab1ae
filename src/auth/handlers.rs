use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, MessageResponse, RefreshRequest, RegisterRequest, TokenPair, WhoAmI},
        extractors::Caller,
        jwt::JwtKeys,
        services,
    },
    error::AppResult,
    extract::ValidJson,
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

/// Mounted behind `require_user`.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/user/logout", post(logout))
        .route("/user/auth", get(who_am_i))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    services::register(state.store.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let keys = JwtKeys::from_ref(&state);
    let pair = services::login(state.store.as_ref(), &keys, payload).await?;
    Ok(Json(pair))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    let keys = JwtKeys::from_ref(&state);
    let pair = services::refresh(state.store.as_ref(), &keys, payload).await?;
    Ok(Json(pair))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>, caller: Caller) -> AppResult<Json<MessageResponse>> {
    services::logout(state.store.as_ref(), caller.id).await?;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

pub async fn who_am_i(caller: Caller) -> Json<WhoAmI> {
    Json(WhoAmI {
        id: caller.id,
        role: caller.role,
    })
}
