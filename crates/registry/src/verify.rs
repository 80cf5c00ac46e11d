use common::{BackgroundKind, BackgroundMeta};
use tracing::warn;

use crate::RegistryConfig;

/// Confirms the sidecar's audio file exists under the asset root for its
/// class. A failure drops the record from the build but leaves the
/// sidecar on disk: the missing file may be transient (slow mount), so
/// cleanup stays an administrative decision.
pub(crate) async fn asset_exists(
    config: &RegistryConfig,
    kind: BackgroundKind,
    id: &str,
    meta: &BackgroundMeta,
) -> bool {
    let path = config.audio_path(kind, id, &meta.filename);
    match tokio::fs::metadata(&path).await {
        Ok(file_meta) if file_meta.is_file() => true,
        _ => {
            warn!(
                "Stale metadata for {} background {}: audio {} not found",
                kind.as_str(),
                id,
                path.display()
            );
            false
        }
    }
}
