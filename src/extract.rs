use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use validator::Validate;

use crate::error::AppError;

/// JSON body that has been parsed and validated. Unparseable bodies become
/// `400 {"error": "Invalid input"}`; rule violations carry the rule's message.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| {
                debug!(error = %e, "request body rejected");
                AppError::validation("Invalid input")
            })?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// Numeric `:id` path segment; anything else is a 400 with a JSON body.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::validation("Invalid id"))?;
        if id <= 0 {
            return Err(AppError::validation("Invalid id"));
        }
        Ok(IdPath(id))
    }
}
