use std::io::ErrorKind;
use std::path::Path;

use common::{id_from_metadata_name, is_safe_component, BackgroundMeta};
use tracing::warn;

use crate::RegistryError;

#[derive(Clone, Debug)]
pub(crate) struct LoadedMeta {
    pub id: String,
    pub meta: BackgroundMeta,
}

/// Reads every `metadata-<id>.json` sidecar in `dir`. One malformed file
/// never aborts the scan: it is logged and skipped. A missing directory
/// yields an empty list, since asset-class directories are optional.
pub(crate) async fn load_metadata_dir(dir: &Path) -> Result<Vec<LoadedMeta>, RegistryError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut loaded = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = match name.to_str() {
            Some(name) => name,
            None => continue,
        };
        let id = match id_from_metadata_name(name) {
            Some(id) => id.to_string(),
            None => continue,
        };

        let path = entry.path();
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(err) => {
                warn!("Skipping unreadable metadata {}: {}", name, err);
                continue;
            }
        };
        let meta: BackgroundMeta = match serde_json::from_slice(&contents) {
            Ok(meta) => meta,
            Err(err) => {
                warn!("Skipping malformed metadata {}: {}", name, err);
                continue;
            }
        };
        if let Err(reason) = validate_meta(&meta) {
            warn!("Skipping invalid metadata {}: {}", name, reason);
            continue;
        }

        loaded.push(LoadedMeta { id, meta });
    }

    Ok(loaded)
}

pub(crate) fn validate_meta(meta: &BackgroundMeta) -> Result<(), String> {
    if meta.custom_name.trim().is_empty() {
        return Err("customName is empty".to_string());
    }
    if !is_safe_component(&meta.filename) {
        return Err(format!("filename is not a plain file name: {:?}", meta.filename));
    }
    Ok(())
}
