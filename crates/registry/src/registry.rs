use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use common::{playback_url, BackgroundKind, BackgroundMeta, BackgroundRecord};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{build_catalog, Catalog};
use crate::loader::validate_meta;
use crate::{ensure_dir, RegistryConfig, RegistryError};

/// In-memory view over the background directories. Reads hand out the
/// last fully-built snapshot; mutations and rebuilds are serialized so
/// metadata and audio never go out of sync.
#[derive(Debug)]
pub struct Registry {
    config: RegistryConfig,
    catalog: RwLock<Arc<Catalog>>,
    generation: AtomicU64,
    stale: AtomicBool,
    mutations: Mutex<()>,
}

impl Registry {
    /// Opens the registry and performs the initial build. An inaccessible
    /// backgrounds root or system assets root is fatal: no catalog could
    /// ever be produced. The custom assets root is created on demand.
    pub async fn open(config: RegistryConfig) -> Result<Self, RegistryError> {
        ensure_dir(&config.backgrounds_root).await?;
        ensure_dir(&config.system_assets_root).await?;
        tokio::fs::create_dir_all(&config.custom_assets_root).await?;

        let registry = Self {
            config,
            catalog: RwLock::new(Arc::new(Catalog::empty())),
            generation: AtomicU64::new(0),
            stale: AtomicBool::new(true),
            mutations: Mutex::new(()),
        };
        registry.refresh().await?;
        Ok(registry)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Current snapshot, rebuilding first if a mutation invalidated it.
    pub async fn read(&self) -> Result<Arc<Catalog>, RegistryError> {
        if self.stale.load(Ordering::Acquire) {
            return self.refresh().await;
        }
        Ok(self.snapshot())
    }

    /// Last built snapshot, never touching the filesystem.
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.catalog.read().clone()
    }

    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::Release);
    }

    /// Rebuilds from disk under the single-writer lock and swaps the new
    /// snapshot in whole, so no reader observes a catalog mid-rebuild.
    pub async fn refresh(&self) -> Result<Arc<Catalog>, RegistryError> {
        let _guard = self.mutations.lock().await;
        self.rebuild_locked().await
    }

    async fn rebuild_locked(&self) -> Result<Arc<Catalog>, RegistryError> {
        // Cleared before the scan so an invalidate() landing mid-rebuild
        // marks the new snapshot stale instead of being clobbered.
        self.stale.store(false, Ordering::Release);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let built = match build_catalog(&self.config, generation).await {
            Ok(built) => built,
            Err(err) => {
                self.stale.store(true, Ordering::Release);
                return Err(err);
            }
        };
        let snapshot = Arc::new(built);
        *self.catalog.write() = snapshot.clone();
        Ok(snapshot)
    }

    /// Creates a custom background. The audio file is written before the
    /// sidecar so a reader rebuilding in between never sees metadata
    /// without its backing asset; if the sidecar write fails the audio is
    /// rolled back.
    pub async fn add(
        &self,
        meta: BackgroundMeta,
        audio: Bytes,
    ) -> Result<BackgroundRecord, RegistryError> {
        validate_meta(&meta).map_err(RegistryError::InvalidMetadata)?;

        let _guard = self.mutations.lock().await;
        let id = Uuid::new_v4().simple().to_string();

        let audio_dir = self.config.custom_audio_dir(&id);
        tokio::fs::create_dir_all(&audio_dir).await?;
        tokio::fs::write(audio_dir.join(&meta.filename), &audio).await?;

        if let Err(err) = self.write_sidecar(&id, &meta).await {
            if let Err(cleanup_err) = tokio::fs::remove_dir_all(&audio_dir).await {
                warn!(
                    "Failed to roll back audio for {} after sidecar write failure: {}",
                    id, cleanup_err
                );
            }
            return Err(err);
        }

        self.invalidate();
        info!("Added custom background {} ({})", id, meta.custom_name);
        let url = playback_url(BackgroundKind::Custom, &id, &meta.filename);
        Ok(BackgroundRecord {
            id,
            custom_name: meta.custom_name,
            filename: meta.filename,
            kind: BackgroundKind::Custom,
            url,
            extra: meta.extra,
        })
    }

    /// Removes a custom background. The sidecar goes first: once it is
    /// gone the record can no longer surface in a rebuild, and the audio
    /// deletion afterwards is pure cleanup. A failed audio deletion is
    /// reported as an orphan but does not fail the call.
    pub async fn remove(&self, id: &str) -> Result<(), RegistryError> {
        if !common::is_safe_component(id) {
            return Err(RegistryError::UnknownBackground(id.to_string()));
        }

        let _guard = self.mutations.lock().await;
        let sidecar = self.config.metadata_path(BackgroundKind::Custom, id);
        match tokio::fs::remove_file(&sidecar).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let system_sidecar = self.config.metadata_path(BackgroundKind::System, id);
                if tokio::fs::metadata(&system_sidecar).await.is_ok() {
                    return Err(RegistryError::ReadOnly(id.to_string()));
                }
                return Err(RegistryError::UnknownBackground(id.to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        let audio_dir = self.config.custom_audio_dir(id);
        match tokio::fs::remove_dir_all(&audio_dir).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(
                    "Removed background {} but its audio at {} is orphaned: {}",
                    id,
                    audio_dir.display(),
                    err
                );
            }
        }

        self.invalidate();
        info!("Removed custom background {}", id);
        Ok(())
    }

    /// Rewrites the display name of a custom background.
    pub async fn rename(&self, id: &str, new_name: &str) -> Result<(), RegistryError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(RegistryError::InvalidMetadata(
                "customName is empty".to_string(),
            ));
        }
        if !common::is_safe_component(id) {
            return Err(RegistryError::UnknownBackground(id.to_string()));
        }

        let _guard = self.mutations.lock().await;
        let sidecar = self.config.metadata_path(BackgroundKind::Custom, id);
        let contents = match tokio::fs::read(&sidecar).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let system_sidecar = self.config.metadata_path(BackgroundKind::System, id);
                if tokio::fs::metadata(&system_sidecar).await.is_ok() {
                    return Err(RegistryError::ReadOnly(id.to_string()));
                }
                return Err(RegistryError::UnknownBackground(id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        let mut meta: BackgroundMeta = serde_json::from_slice(&contents)?;
        meta.custom_name = new_name.to_string();
        self.write_sidecar(id, &meta).await?;

        self.invalidate();
        Ok(())
    }

    async fn write_sidecar(&self, id: &str, meta: &BackgroundMeta) -> Result<(), RegistryError> {
        let dir = self.config.metadata_dir(BackgroundKind::Custom);
        tokio::fs::create_dir_all(&dir).await?;
        let contents = serde_json::to_vec_pretty(meta)?;
        tokio::fs::write(self.config.metadata_path(BackgroundKind::Custom, id), contents).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config(root: &Path) -> RegistryConfig {
        RegistryConfig {
            backgrounds_root: root.join("backgrounds"),
            system_assets_root: root.join("assets"),
            custom_assets_root: root.join("custom-assets"),
        }
    }

    fn seed_roots(config: &RegistryConfig) {
        std::fs::create_dir_all(&config.backgrounds_root).unwrap();
        std::fs::create_dir_all(&config.system_assets_root).unwrap();
    }

    fn meta(filename: &str, name: &str) -> BackgroundMeta {
        BackgroundMeta {
            filename: filename.to_string(),
            custom_name: name.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn open_fails_on_missing_backgrounds_root() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        std::fs::create_dir_all(&config.system_assets_root).unwrap();
        let err = Registry::open(config).await.unwrap_err();
        assert!(matches!(err, RegistryError::RootUnavailable(_)));
    }

    #[tokio::test]
    async fn add_then_read_includes_the_record() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        seed_roots(&config);
        let registry = Registry::open(config.clone()).await.unwrap();

        let record = registry
            .add(meta("waves.mp3", "Ocean Waves"), Bytes::from_static(b"audio"))
            .await
            .unwrap();
        assert_eq!(record.kind, BackgroundKind::Custom);
        assert_eq!(
            record.url,
            format!("/custom-assets/{}/waves.mp3", record.id)
        );
        assert!(config
            .audio_path(BackgroundKind::Custom, &record.id, "waves.mp3")
            .is_file());
        assert!(config
            .metadata_path(BackgroundKind::Custom, &record.id)
            .is_file());

        let catalog = registry.read().await.unwrap();
        let found = catalog.get(&record.id).unwrap();
        assert_eq!(found.custom_name, "Ocean Waves");
    }

    #[tokio::test]
    async fn add_rolls_back_audio_when_sidecar_write_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        seed_roots(&config);
        let registry = Registry::open(config.clone()).await.unwrap();
        // A plain file where the custom metadata directory must go makes
        // the sidecar write fail after the audio write succeeded.
        std::fs::write(config.metadata_dir(BackgroundKind::Custom), b"in the way").unwrap();

        let err = registry
            .add(meta("waves.mp3", "Ocean Waves"), Bytes::from_static(b"audio"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Io(_)));

        let mut entries = std::fs::read_dir(&config.custom_assets_root).unwrap();
        assert!(entries.next().is_none(), "orphan audio left behind");
    }

    #[tokio::test]
    async fn add_rejects_invalid_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        seed_roots(&config);
        let registry = Registry::open(config).await.unwrap();

        let err = registry
            .add(meta("../escape.mp3", "Escape"), Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidMetadata(_)));
        let err = registry
            .add(meta("ok.mp3", "  "), Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidMetadata(_)));
    }

    #[tokio::test]
    async fn remove_deletes_sidecar_and_audio() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        seed_roots(&config);
        let registry = Registry::open(config.clone()).await.unwrap();
        let record = registry
            .add(meta("waves.mp3", "Ocean Waves"), Bytes::from_static(b"audio"))
            .await
            .unwrap();

        registry.remove(&record.id).await.unwrap();
        assert!(!config
            .metadata_path(BackgroundKind::Custom, &record.id)
            .exists());
        assert!(!config.custom_audio_dir(&record.id).exists());

        let catalog = registry.read().await.unwrap();
        assert!(catalog.get(&record.id).is_none());
    }

    #[tokio::test]
    async fn remove_unknown_id_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        seed_roots(&config);
        let registry = Registry::open(config).await.unwrap();
        let err = registry.remove("nope").await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownBackground(_)));
    }

    #[tokio::test]
    async fn system_backgrounds_are_read_only() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        seed_roots(&config);
        let system_dir = config.metadata_dir(BackgroundKind::System);
        std::fs::create_dir_all(&system_dir).unwrap();
        std::fs::write(
            system_dir.join("metadata-forest.json"),
            r#"{"filename":"forest-rain.audio","customName":"Forest Rain"}"#,
        )
        .unwrap();
        let registry = Registry::open(config).await.unwrap();

        let err = registry.remove("forest").await.unwrap_err();
        assert!(matches!(err, RegistryError::ReadOnly(_)));
        let err = registry.rename("forest", "New Name").await.unwrap_err();
        assert!(matches!(err, RegistryError::ReadOnly(_)));
    }

    #[tokio::test]
    async fn rename_updates_the_display_name() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        seed_roots(&config);
        let registry = Registry::open(config).await.unwrap();
        let record = registry
            .add(meta("waves.mp3", "Ocean Waves"), Bytes::from_static(b"audio"))
            .await
            .unwrap();

        registry.rename(&record.id, "Calm Seas").await.unwrap();
        let catalog = registry.read().await.unwrap();
        assert_eq!(catalog.get(&record.id).unwrap().custom_name, "Calm Seas");
    }

    #[tokio::test]
    async fn snapshot_is_served_until_invalidated() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        seed_roots(&config);
        let registry = Registry::open(config.clone()).await.unwrap();
        let before = registry.read().await.unwrap();

        // An out-of-band change is invisible until invalidate().
        let system_dir = config.metadata_dir(BackgroundKind::System);
        std::fs::create_dir_all(&system_dir).unwrap();
        std::fs::write(
            system_dir.join("metadata-forest.json"),
            r#"{"filename":"forest-rain.audio","customName":"Forest Rain"}"#,
        )
        .unwrap();
        std::fs::write(config.system_assets_root.join("forest-rain.audio"), b"x").unwrap();

        let unchanged = registry.read().await.unwrap();
        assert_eq!(unchanged.generation, before.generation);
        assert!(unchanged.records.is_empty());

        registry.invalidate();
        let rebuilt = registry.read().await.unwrap();
        assert!(rebuilt.generation > before.generation);
        assert_eq!(rebuilt.records.len(), 1);
        assert_eq!(rebuilt.records[0].url, "/assets/forest-rain.audio");
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_the_cache_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        seed_roots(&config);
        let registry = Registry::open(config.clone()).await.unwrap();

        // A plain file where the system metadata directory should be
        // makes the directory scan fail outright.
        let system_dir = config.metadata_dir(BackgroundKind::System);
        std::fs::write(&system_dir, b"in the way").unwrap();
        registry.invalidate();
        assert!(registry.read().await.is_err());

        // Once repaired, the next read must rebuild: the failure may not
        // leave the cache marked fresh.
        std::fs::remove_file(&system_dir).unwrap();
        std::fs::create_dir_all(&system_dir).unwrap();
        std::fs::write(
            system_dir.join("metadata-forest.json"),
            r#"{"filename":"forest-rain.audio","customName":"Forest Rain"}"#,
        )
        .unwrap();
        std::fs::write(config.system_assets_root.join("forest-rain.audio"), b"x").unwrap();

        let catalog = registry.read().await.unwrap();
        assert_eq!(catalog.records.len(), 1);
        assert_eq!(catalog.records[0].id, "forest");
    }

    #[tokio::test]
    async fn generation_is_monotonic_across_refreshes() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        seed_roots(&config);
        let registry = Registry::open(config).await.unwrap();
        let first = registry.refresh().await.unwrap();
        let second = registry.refresh().await.unwrap();
        assert!(second.generation > first.generation);
    }
}
