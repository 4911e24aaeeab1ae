use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    applications::{
        dto::{
            ApplicationView, ChangeStatusRequest, CreatedResponse, SubmitApplicationRequest,
            UpdateApplicationRequest,
        },
        services,
    },
    auth::{dto::MessageResponse, extractors::Caller},
    error::AppResult,
    extract::{IdPath, ValidJson},
    state::AppState,
};

/// Mounted behind `require_user`.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/user/freelancer/applications",
            get(list_applications).post(submit_application),
        )
        .route(
            "/user/freelancer/applications/:id",
            get(get_application)
                .put(update_application)
                .delete(delete_application),
        )
        .route("/user/client/applications/:id", post(change_status))
        .route("/user/attachments/:id", get(download_attachment))
}

#[instrument(skip(state))]
pub async fn list_applications(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<Vec<ApplicationView>>> {
    Ok(Json(services::list_mine(state.store.as_ref(), caller).await?))
}

#[instrument(skip(state))]
pub async fn get_application(
    State(state): State<AppState>,
    caller: Caller,
    IdPath(id): IdPath,
) -> AppResult<Json<ApplicationView>> {
    Ok(Json(services::get_mine(state.store.as_ref(), caller, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn submit_application(
    State(state): State<AppState>,
    caller: Caller,
    ValidJson(payload): ValidJson<SubmitApplicationRequest>,
) -> AppResult<Json<CreatedResponse>> {
    let id = services::submit(
        state.store.as_ref(),
        state.storage.as_ref(),
        caller,
        payload,
        state.config.max_attachment_bytes,
    )
    .await?;
    Ok(Json(CreatedResponse {
        message: "Application submitted successfully".into(),
        id,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_application(
    State(state): State<AppState>,
    caller: Caller,
    IdPath(id): IdPath,
    ValidJson(payload): ValidJson<UpdateApplicationRequest>,
) -> AppResult<Json<ApplicationView>> {
    let view = services::update(
        state.store.as_ref(),
        state.storage.as_ref(),
        caller,
        id,
        payload,
        state.config.max_attachment_bytes,
    )
    .await?;
    Ok(Json(view))
}

#[instrument(skip(state))]
pub async fn delete_application(
    State(state): State<AppState>,
    caller: Caller,
    IdPath(id): IdPath,
) -> AppResult<Json<MessageResponse>> {
    services::delete(state.store.as_ref(), state.storage.as_ref(), caller, id).await?;
    Ok(Json(MessageResponse::new("Application deleted successfully")))
}

#[instrument(skip(state))]
pub async fn change_status(
    State(state): State<AppState>,
    caller: Caller,
    IdPath(id): IdPath,
    ValidJson(payload): ValidJson<ChangeStatusRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::change_status(state.store.as_ref(), caller, id, payload).await?;
    Ok(Json(MessageResponse::new("Application status updated successfully")))
}

/// Quotes and control characters would break the header.
fn disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

#[instrument(skip(state))]
pub async fn download_attachment(
    State(state): State<AppState>,
    caller: Caller,
    IdPath(id): IdPath,
) -> AppResult<impl IntoResponse> {
    let file = services::download_attachment(state.store.as_ref(), state.storage.as_ref(), caller, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition(&file.file_name)),
        ],
        file.body,
    ))
}

#[cfg(test)]
mod tests {
    use super::disposition;

    #[test]
    fn disposition_strips_quotes() {
        assert_eq!(disposition("cv.pdf"), "attachment; filename=\"cv.pdf\"");
        assert_eq!(disposition("a\"b\n.pdf"), "attachment; filename=\"ab.pdf\"");
    }
}
