pub mod backgrounds;
pub mod media;

use axum::extract::DefaultBodyLimit;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::state::{AppState, HealthResponse};

pub fn api_router(state: AppState) -> Router {
    let max_upload = state.config.read().max_upload_bytes;

    let api = Router::new()
        .route("/backgrounds", get(backgrounds::list_backgrounds))
        .route("/backgrounds", post(backgrounds::upload_background))
        .route("/backgrounds/refresh", post(backgrounds::refresh_backgrounds))
        .route("/backgrounds/:id", delete(backgrounds::delete_background))
        .route("/backgrounds/:id/name", post(backgrounds::rename_background))
        .layer(DefaultBodyLimit::max(max_upload));

    Router::new()
        .route("/health", get(health))
        .route("/assets/:filename", get(media::serve_system_audio))
        .route("/custom-assets/:id/:filename", get(media::serve_custom_audio))
        .nest("/api/v1", api)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
