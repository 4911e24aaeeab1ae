use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::instrument;

use crate::{
    applications::dto::CreatedResponse,
    auth::{dto::MessageResponse, extractors::Caller},
    error::AppResult,
    extract::{IdPath, ValidJson},
    jobs::{
        dto::{ClientJobDetail, ClientJobView, CreateJobRequest, JobView, UpdateJobRequest},
        services,
    },
    state::AppState,
};

/// Mounted behind `require_user`.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job))
        .route("/user/client/jobs", get(client_jobs))
        .route(
            "/user/client/jobs/:id",
            get(client_job).put(update_client_job).delete(delete_client_job),
        )
        .route("/user/freelancer/jobs", get(freelancer_jobs))
        .route("/user/freelancer/jobs/:id", get(freelancer_job))
}

/// Mounted behind `require_admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/jobs/:id", delete(admin_delete_job))
}

pub async fn list_jobs(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Vec<JobView>>> {
    Ok(Json(services::list_open(state.store.as_ref(), caller).await?))
}

#[instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    caller: Caller,
    IdPath(id): IdPath,
) -> AppResult<Json<JobView>> {
    Ok(Json(services::get_job(state.store.as_ref(), caller, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_job(
    State(state): State<AppState>,
    caller: Caller,
    ValidJson(payload): ValidJson<CreateJobRequest>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    let id = services::create(state.store.as_ref(), caller, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Job created successfully".into(),
            id,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn client_jobs(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Vec<ClientJobView>>> {
    Ok(Json(services::client_jobs(state.store.as_ref(), caller).await?))
}

#[instrument(skip(state))]
pub async fn client_job(
    State(state): State<AppState>,
    caller: Caller,
    IdPath(id): IdPath,
) -> AppResult<Json<ClientJobDetail>> {
    Ok(Json(services::client_job(state.store.as_ref(), caller, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_client_job(
    State(state): State<AppState>,
    caller: Caller,
    IdPath(id): IdPath,
    ValidJson(payload): ValidJson<UpdateJobRequest>,
) -> AppResult<Json<JobView>> {
    let job = services::update_client_job(state.store.as_ref(), caller, id, payload).await?;
    Ok(Json(job))
}

#[instrument(skip(state))]
pub async fn delete_client_job(
    State(state): State<AppState>,
    caller: Caller,
    IdPath(id): IdPath,
) -> AppResult<Json<MessageResponse>> {
    services::delete_client_job(state.store.as_ref(), state.storage.as_ref(), caller, id).await?;
    Ok(Json(MessageResponse::new("Job deleted successfully")))
}

#[instrument(skip(state))]
pub async fn freelancer_jobs(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Vec<JobView>>> {
    Ok(Json(services::freelancer_jobs(state.store.as_ref(), caller).await?))
}

#[instrument(skip(state))]
pub async fn freelancer_job(
    State(state): State<AppState>,
    caller: Caller,
    IdPath(id): IdPath,
) -> AppResult<Json<JobView>> {
    Ok(Json(services::freelancer_job(state.store.as_ref(), caller, id).await?))
}

#[instrument(skip(state))]
pub async fn admin_delete_job(State(state): State<AppState>, IdPath(id): IdPath) -> AppResult<Json<MessageResponse>> {
    services::admin_delete_job(state.store.as_ref(), state.storage.as_ref(), id).await?;
    Ok(Json(MessageResponse::new("Job deleted successfully")))
}
