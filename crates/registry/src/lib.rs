mod catalog;
mod loader;
mod registry;
mod verify;

use std::path::{Path, PathBuf};

use common::{metadata_file_name, BackgroundKind};

pub use catalog::Catalog;
pub use registry::Registry;

/// Filesystem roots for one registry instance, injected at construction.
/// System audio lives flat under the shared assets root; custom audio is
/// scoped under a per-id directory.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    pub backgrounds_root: PathBuf,
    pub system_assets_root: PathBuf,
    pub custom_assets_root: PathBuf,
}

impl RegistryConfig {
    pub fn metadata_dir(&self, kind: BackgroundKind) -> PathBuf {
        self.backgrounds_root.join(kind.as_str())
    }

    pub fn metadata_path(&self, kind: BackgroundKind, id: &str) -> PathBuf {
        self.metadata_dir(kind).join(metadata_file_name(id))
    }

    pub fn audio_path(&self, kind: BackgroundKind, id: &str, filename: &str) -> PathBuf {
        match kind {
            BackgroundKind::System => self.system_assets_root.join(filename),
            BackgroundKind::Custom => self.custom_assets_root.join(id).join(filename),
        }
    }

    pub fn custom_audio_dir(&self, id: &str) -> PathBuf {
        self.custom_assets_root.join(id)
    }
}

#[derive(Debug)]
pub enum RegistryError {
    Io(std::io::Error),
    Json(serde_json::Error),
    RootUnavailable(PathBuf),
    UnknownBackground(String),
    ReadOnly(String),
    InvalidMetadata(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Io(err) => write!(f, "io error: {}", err),
            RegistryError::Json(err) => write!(f, "json error: {}", err),
            RegistryError::RootUnavailable(path) => {
                write!(f, "root directory unavailable: {}", path.display())
            }
            RegistryError::UnknownBackground(id) => {
                write!(f, "unknown background: {}", id)
            }
            RegistryError::ReadOnly(id) => {
                write!(f, "background is read-only: {}", id)
            }
            RegistryError::InvalidMetadata(reason) => {
                write!(f, "invalid metadata: {}", reason)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err)
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Json(err)
    }
}

pub(crate) async fn ensure_dir(path: &Path) -> Result<(), RegistryError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(RegistryError::RootUnavailable(path.to_path_buf())),
        Err(_) => Err(RegistryError::RootUnavailable(path.to_path_buf())),
    }
}
