use crate::error::{AppError, Result};
use crate::owner::Owner;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// `GET /api/user/urls`: 200 with the caller's URLs, 204 when there are none.
pub async fn list(State(state): State<AppState>, Owner(owner): Owner) -> Result<Response> {
    let urls = state.shortener().list(owner).await?;
    if urls.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(urls).into_response())
}

/// `DELETE /api/user/urls` with a JSON array of keys.
///
/// Answers 202 as soon as the request is queued; keys that are not the
/// caller's are skipped when the deletion is applied.
pub async fn delete(
    State(state): State<AppState>,
    Owner(owner): Owner,
    payload: std::result::Result<Json<Vec<String>>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(keys) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    state.shortener().delete(owner, keys).await?;
    Ok(StatusCode::ACCEPTED)
}
