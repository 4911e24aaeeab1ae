use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{dto::MessageResponse, extractors::Caller},
    error::AppResult,
    extract::{IdPath, ValidJson},
    state::AppState,
    users::{
        dto::{
            AdminUpdateUserRequest, AdminUserView, ClientSummary, FreelancerSummary,
            UpdateClientRequest, UpdateFreelancerRequest, UpdateUserRequest, UserView,
        },
        services,
    },
};

// --- routers ---

/// Mounted behind `require_user`.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(get_me).put(update_me).delete(delete_me))
        .route("/user/freelancer", put(update_freelancer))
        .route("/user/client", put(update_client))
        .route("/freelancers", get(list_freelancers))
        .route("/freelancers/:id", get(get_freelancer))
        .route("/clients", get(list_clients))
        .route("/clients/:id", get(get_client))
}

/// Mounted behind `require_admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(admin_list_users))
        .route("/admin/users/:id", put(admin_update_user).delete(admin_delete_user))
}

// --- self-service ---

#[instrument(skip(state))]
pub async fn get_me(State(state): State<AppState>, caller: Caller) -> AppResult<Json<UserView>> {
    Ok(Json(services::get_me(state.store.as_ref(), caller).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    caller: Caller,
    ValidJson(payload): ValidJson<UpdateUserRequest>,
) -> AppResult<Json<UserView>> {
    Ok(Json(services::update_me(state.store.as_ref(), caller, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_me(State(state): State<AppState>, caller: Caller) -> AppResult<Json<MessageResponse>> {
    services::delete_user_and_files(state.store.as_ref(), state.storage.as_ref(), caller.id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

#[instrument(skip(state, payload))]
pub async fn update_freelancer(
    State(state): State<AppState>,
    caller: Caller,
    ValidJson(payload): ValidJson<UpdateFreelancerRequest>,
) -> AppResult<Json<UserView>> {
    let view = services::update_freelancer_profile(state.store.as_ref(), caller, payload).await?;
    Ok(Json(view))
}

#[instrument(skip(state, payload))]
pub async fn update_client(
    State(state): State<AppState>,
    caller: Caller,
    ValidJson(payload): ValidJson<UpdateClientRequest>,
) -> AppResult<Json<UserView>> {
    let view = services::update_client_profile(state.store.as_ref(), caller, payload).await?;
    Ok(Json(view))
}

// --- directory ---

pub async fn list_freelancers(State(state): State<AppState>) -> AppResult<Json<Vec<FreelancerSummary>>> {
    Ok(Json(services::list_freelancers(state.store.as_ref()).await?))
}

pub async fn get_freelancer(State(state): State<AppState>, IdPath(id): IdPath) -> AppResult<Json<UserView>> {
    Ok(Json(services::get_freelancer(state.store.as_ref(), id).await?))
}

pub async fn list_clients(State(state): State<AppState>) -> AppResult<Json<Vec<ClientSummary>>> {
    Ok(Json(services::list_clients(state.store.as_ref()).await?))
}

pub async fn get_client(State(state): State<AppState>, IdPath(id): IdPath) -> AppResult<Json<UserView>> {
    Ok(Json(services::get_client(state.store.as_ref(), id).await?))
}

// --- admin ---

#[instrument(skip(state))]
pub async fn admin_list_users(State(state): State<AppState>) -> AppResult<Json<Vec<AdminUserView>>> {
    Ok(Json(services::admin_list_users(state.store.as_ref()).await?))
}

#[instrument(skip(state, payload))]
pub async fn admin_update_user(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    ValidJson(payload): ValidJson<AdminUpdateUserRequest>,
) -> AppResult<Json<AdminUserView>> {
    Ok(Json(services::admin_update_user(state.store.as_ref(), id, payload).await?))
}

#[instrument(skip(state))]
pub async fn admin_delete_user(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> AppResult<Json<MessageResponse>> {
    services::delete_user_and_files(state.store.as_ref(), state.storage.as_ref(), id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
