use std::collections::HashSet;

use common::{playback_url, BackgroundKind, BackgroundRecord};
use tracing::{info, warn};

use crate::loader::load_metadata_dir;
use crate::verify::asset_exists;
use crate::{RegistryConfig, RegistryError};

#[derive(Clone, Debug)]
pub struct Catalog {
    pub records: Vec<BackgroundRecord>,
    pub generation: u64,
}

impl Catalog {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            generation: 0,
        }
    }

    pub fn get(&self, id: &str) -> Option<&BackgroundRecord> {
        self.records.iter().find(|record| record.id == id)
    }
}

/// Merges both asset classes into one ordered catalog: system records
/// first, then custom, each class sorted by id so rebuilds never depend
/// on directory-listing order. Ids are unique catalog-wide; system wins
/// a collision because it is materialized first.
pub(crate) async fn build_catalog(
    config: &RegistryConfig,
    generation: u64,
) -> Result<Catalog, RegistryError> {
    let mut records = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for kind in [BackgroundKind::System, BackgroundKind::Custom] {
        let mut loaded = load_metadata_dir(&config.metadata_dir(kind)).await?;
        loaded.sort_by(|a, b| a.id.cmp(&b.id));

        for entry in loaded {
            if seen.contains(&entry.id) {
                warn!(
                    "Dropping {} background {}: id already in catalog",
                    kind.as_str(),
                    entry.id
                );
                continue;
            }
            if !asset_exists(config, kind, &entry.id, &entry.meta).await {
                continue;
            }
            seen.insert(entry.id.clone());
            let url = playback_url(kind, &entry.id, &entry.meta.filename);
            records.push(BackgroundRecord {
                id: entry.id,
                custom_name: entry.meta.custom_name,
                filename: entry.meta.filename,
                kind,
                url,
                extra: entry.meta.extra,
            });
        }
    }

    info!("{} backgrounds found", records.len());
    Ok(Catalog {
        records,
        generation,
    })
}
