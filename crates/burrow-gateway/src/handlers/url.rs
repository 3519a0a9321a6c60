use crate::error::{AppError, Result};
use crate::model::{ShortenRequest, ShortenResponse};
use crate::owner::{owner_or_anonymous, Owner};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use burrow_core::{BatchItem, ShortCode, ShortenerError};

/// `POST /` with the URL as a plain-text body.
///
/// 201 with the short URL, or 409 with the existing one.
pub async fn shorten_text(
    State(state): State<AppState>,
    owner: Option<Owner>,
    body: String,
) -> Result<Response> {
    let owner = owner_or_anonymous(owner);

    match state.shortener().shorten(body.trim(), owner).await {
        Ok(short_url) => Ok((StatusCode::CREATED, short_url).into_response()),
        Err(ShortenerError::DuplicateUrl { short_url }) => {
            Ok((StatusCode::CONFLICT, short_url).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// `POST /api/shorten` with `{"url": ...}`, answered with `{"result": ...}`.
pub async fn shorten_json(
    State(state): State<AppState>,
    owner: Option<Owner>,
    payload: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let owner = owner_or_anonymous(owner);

    let (status, result) = match state.shortener().shorten(&request.url, owner).await {
        Ok(short_url) => (StatusCode::CREATED, short_url),
        Err(ShortenerError::DuplicateUrl { short_url }) => (StatusCode::CONFLICT, short_url),
        Err(err) => return Err(err.into()),
    };

    Ok((status, Json(ShortenResponse { result })).into_response())
}

/// `POST /api/shorten/batch`: all items are stored or none.
pub async fn shorten_batch(
    State(state): State<AppState>,
    owner: Option<Owner>,
    payload: std::result::Result<Json<Vec<BatchItem>>, JsonRejection>,
) -> Result<Response> {
    let Json(items) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if items.is_empty() {
        return Err(AppError::BadRequest("batch is empty".to_string()));
    }

    let results = state
        .shortener()
        .shorten_batch(items, owner_or_anonymous(owner))
        .await?;

    Ok((StatusCode::CREATED, Json(results)).into_response())
}

/// `GET /{key}`: 307 to the original URL, 404 for unknown keys, 410 for
/// deleted ones.
pub async fn redirect(Path(key): Path<String>, State(state): State<AppState>) -> Result<Redirect> {
    let code = ShortCode::new(key)?;
    let url = state.shortener().resolve(&code).await?.into_url(&code)?;
    Ok(Redirect::temporary(&url))
}
