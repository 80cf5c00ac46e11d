use std::path::Path;

use axum::body::Body;
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use common::{is_safe_component, BackgroundKind};
use tokio_util::io::ReaderStream;

use crate::state::AppState;
use crate::utils::json_error_response;

pub async fn serve_system_audio(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
) -> Response {
    if !is_safe_component(&filename) {
        return json_error_response(StatusCode::BAD_REQUEST, "invalid file name");
    }
    let path = state
        .registry
        .config()
        .audio_path(BackgroundKind::System, "", &filename);
    stream_audio(&path).await
}

pub async fn serve_custom_audio(
    State(state): State<AppState>,
    AxumPath((id, filename)): AxumPath<(String, String)>,
) -> Response {
    if !is_safe_component(&id) || !is_safe_component(&filename) {
        return json_error_response(StatusCode::BAD_REQUEST, "invalid path");
    }
    let path = state
        .registry
        .config()
        .audio_path(BackgroundKind::Custom, &id, &filename);
    stream_audio(&path).await
}

async fn stream_audio(path: &Path) -> Response {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(_) => return json_error_response(StatusCode::NOT_FOUND, "audio not found"),
    };
    let size = file.metadata().await.ok().map(|meta| meta.len());
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.as_ref())
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    if let Some(size) = size {
        if let Ok(value) = HeaderValue::from_str(&size.to_string()) {
            response.headers_mut().insert(header::CONTENT_LENGTH, value);
        }
    }
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );
    response
}
