use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use notify::RecommendedWatcher;
use parking_lot::RwLock;
use registry::Registry;
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub config_path: PathBuf,
    pub config: Arc<RwLock<ServerConfig>>,
    pub watcher: Arc<RwLock<Option<RecommendedWatcher>>>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct CatalogResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub generation: u64,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    #[serde(rename = "customName")]
    pub custom_name: String,
}

pub type JsonResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;
