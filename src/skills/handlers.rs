use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{dto::MessageResponse, extractors::Caller},
    error::AppResult,
    extract::{IdPath, ValidJson},
    skills::{
        dto::{SkillLinkRequest, SkillNameRequest},
        repo_types::Skill,
        services,
    },
    state::AppState,
};

/// Mounted behind `require_user`.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/skills", get(list_skills))
        .route("/user/freelancer/skills", post(attach_skill).delete(detach_skill))
}

/// Mounted behind `require_admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/skills", post(create_skill))
        .route("/admin/skills/:id", put(rename_skill).delete(delete_skill))
}

pub async fn list_skills(State(state): State<AppState>) -> AppResult<Json<Vec<Skill>>> {
    Ok(Json(services::list(state.store.as_ref()).await?))
}

#[instrument(skip(state))]
pub async fn attach_skill(
    State(state): State<AppState>,
    caller: Caller,
    ValidJson(payload): ValidJson<SkillLinkRequest>,
) -> AppResult<Json<Vec<Skill>>> {
    Ok(Json(services::attach(state.store.as_ref(), caller, payload.skill_id).await?))
}

#[instrument(skip(state))]
pub async fn detach_skill(
    State(state): State<AppState>,
    caller: Caller,
    ValidJson(payload): ValidJson<SkillLinkRequest>,
) -> AppResult<Json<Vec<Skill>>> {
    Ok(Json(services::detach(state.store.as_ref(), caller, payload.skill_id).await?))
}

#[instrument(skip(state))]
pub async fn create_skill(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SkillNameRequest>,
) -> AppResult<Json<Skill>> {
    let skill = services::create(state.store.as_ref(), &payload.name).await?;
    Ok(Json(skill))
}

#[instrument(skip(state))]
pub async fn rename_skill(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    ValidJson(payload): ValidJson<SkillNameRequest>,
) -> AppResult<Json<Skill>> {
    Ok(Json(services::rename(state.store.as_ref(), id, &payload.name).await?))
}

#[instrument(skip(state))]
pub async fn delete_skill(State(state): State<AppState>, IdPath(id): IdPath) -> AppResult<Json<MessageResponse>> {
    services::delete(state.store.as_ref(), id).await?;
    Ok(Json(MessageResponse::new("Skill deleted successfully")))
}
