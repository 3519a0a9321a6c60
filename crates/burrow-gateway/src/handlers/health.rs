use crate::error::Result;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use burrow_core::Stats;
use tracing::error;

/// `GET /ping`: 200 when the storage backend answers, 500 otherwise.
pub async fn ping(State(state): State<AppState>) -> StatusCode {
    match state.shortener().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            error!(error = %err, "storage ping failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `GET /api/internal/stats`
pub async fn stats(State(state): State<AppState>) -> Result<Json<Stats>> {
    Ok(Json(state.shortener().stats().await?))
}
