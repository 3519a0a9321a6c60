use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, url, user};
use crate::state::AppState;
use crate::subnet;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        let internal = Router::new()
            .route("/internal/stats", get(health::stats))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                subnet::require_trusted,
            ));

        Router::new()
            .route("/", post(url::shorten_text))
            .route("/ping", get(health::ping))
            .route("/{key}", get(url::redirect))
            .nest(
                "/api",
                Router::new()
                    .route("/shorten", post(url::shorten_json))
                    .route("/shorten/batch", post(url::shorten_batch))
                    .route("/user/urls", get(user::list).delete(user::delete))
                    .merge(internal),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
