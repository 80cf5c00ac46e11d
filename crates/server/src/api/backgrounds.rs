use axum::extract::{Multipart, Path as AxumPath, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use common::{BackgroundMeta, BackgroundRecord};
use serde::Deserialize;
use tracing::warn;

use crate::state::{AppState, CatalogResponse, HealthResponse, JsonResult, RenameRequest};
use crate::utils::{json_error, registry_error};

pub async fn list_backgrounds(
    State(state): State<AppState>,
) -> JsonResult<CatalogResponse<BackgroundRecord>> {
    let catalog = state.registry.read().await.map_err(registry_error)?;
    Ok(Json(CatalogResponse {
        total: catalog.records.len(),
        items: catalog.records.clone(),
        generation: catalog.generation,
    }))
}

pub async fn refresh_backgrounds(
    State(state): State<AppState>,
) -> JsonResult<CatalogResponse<BackgroundRecord>> {
    let catalog = state.registry.refresh().await.map_err(registry_error)?;
    Ok(Json(CatalogResponse {
        total: catalog.records.len(),
        items: catalog.records.clone(),
        generation: catalog.generation,
    }))
}

/// Upload metadata part. `filename` may be omitted when the audio part
/// carries a file name of its own.
#[derive(Debug, Deserialize)]
struct UploadMeta {
    #[serde(rename = "customName")]
    custom_name: String,
    filename: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

pub async fn upload_background(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> JsonResult<BackgroundRecord> {
    let mut meta: Option<UploadMeta> = None;
    let mut audio: Option<(Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        json_error(StatusCode::BAD_REQUEST, format!("invalid multipart body: {}", err))
    })? {
        let name = field.name().map(|value| value.to_string());
        match name.as_deref() {
            Some("metadata") => {
                let text = field.text().await.map_err(|err| {
                    json_error(StatusCode::BAD_REQUEST, format!("metadata field: {}", err))
                })?;
                let parsed: UploadMeta = serde_json::from_str(&text).map_err(|err| {
                    json_error(StatusCode::BAD_REQUEST, format!("metadata json: {}", err))
                })?;
                meta = Some(parsed);
            }
            Some("audio") => {
                let file_name = field.file_name().map(|name| name.to_string());
                let bytes = field.bytes().await.map_err(|err| {
                    json_error(StatusCode::BAD_REQUEST, format!("audio field: {}", err))
                })?;
                audio = Some((file_name, bytes));
            }
            Some(other) => {
                warn!("Ignoring unexpected upload field {}", other);
            }
            None => {}
        }
    }

    let meta = meta.ok_or_else(|| {
        json_error(StatusCode::BAD_REQUEST, "missing metadata field")
    })?;
    let (file_name, bytes) = audio.ok_or_else(|| {
        json_error(StatusCode::BAD_REQUEST, "missing audio field")
    })?;
    if bytes.is_empty() {
        return Err(json_error(StatusCode::BAD_REQUEST, "audio file is empty"));
    }
    let filename = meta.filename.or(file_name).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "no filename in metadata or audio part",
        )
    })?;

    let record = state
        .registry
        .add(
            BackgroundMeta {
                filename,
                custom_name: meta.custom_name,
                extra: meta.extra,
            },
            bytes,
        )
        .await
        .map_err(registry_error)?;
    Ok(Json(record))
}

pub async fn delete_background(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> JsonResult<HealthResponse> {
    state.registry.remove(&id).await.map_err(registry_error)?;
    Ok(Json(HealthResponse { status: "ok" }))
}

pub async fn rename_background(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(request): Json<RenameRequest>,
) -> JsonResult<HealthResponse> {
    state
        .registry
        .rename(&id, &request.custom_name)
        .await
        .map_err(registry_error)?;
    Ok(Json(HealthResponse { status: "ok" }))
}
