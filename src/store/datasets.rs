use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::autofill::SavedValueCollection;
use crate::store::{dataset_name, select_relevant, AutofillRepository};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// On-disk layout: the naming counter plus one serialized collection per
/// dataset name. Records stay as raw JSON so one bad record cannot poison the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetFile {
    #[serde(default)]
    dataset_number: u64,
    #[serde(default)]
    datasets: BTreeMap<String, Value>,
}

/// Key-value store of saved collections kept in a single JSON file.
///
/// Not meant for real credentials: values are written unencrypted.
pub struct JsonDatasetStore {
    path: PathBuf,
    data: RwLock<DatasetFile>,
}

impl JsonDatasetStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create dataset directory {}", parent.display())
            })?;
        }

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read datasets from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(err) => {
                    log_warn!("Dataset file {} is unreadable, starting empty: {}", path.display(), err);
                    DatasetFile::default()
                }
            }
        } else {
            DatasetFile::default()
        };

        log_info!("Dataset store opened at {} ({} datasets)", path.display(), data.datasets.len());

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current state and releases the store.
    pub fn close(self) -> Result<()> {
        let data = self.data.into_inner().unwrap_or_else(PoisonError::into_inner);
        persist(&self.path, &data)
    }

    /// Number the next saved collection will receive.
    pub fn dataset_number(&self) -> u64 {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dataset_number
    }

    pub fn save(&self, mut collection: SavedValueCollection) -> Result<String> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("dataset store lock poisoned"))?;

        let name = dataset_name(guard.dataset_number);
        if !collection.assign_name(name.clone()) {
            bail!(
                "collection already saved as {}",
                collection.dataset_name().unwrap_or_default()
            );
        }

        let record = serde_json::to_value(&collection).context("failed to serialize collection")?;
        let mut next = guard.clone();
        next.datasets.insert(name.clone(), record);
        next.dataset_number += 1;
        persist(&self.path, &next)?;
        *guard = next;

        log_info!("Saved {} with {} values", name, collection.len());
        Ok(name)
    }

    /// Stored collections relevant to `all_hints`, gated on relevance to
    /// `focused_hints`. Malformed records are dropped.
    pub fn load(
        &self,
        focused_hints: &[String],
        all_hints: &[String],
    ) -> Option<BTreeMap<String, SavedValueCollection>> {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let collections = guard.datasets.iter().filter_map(|(name, record)| {
            match serde_json::from_value::<SavedValueCollection>(record.clone()) {
                Ok(collection) => Some(collection),
                Err(err) => {
                    log_warn!("Dropping malformed dataset {}: {}", name, err);
                    None
                }
            }
        });
        select_relevant(collections, focused_hints, all_hints)
    }

    /// Forgets every saved collection. The naming counter keeps counting.
    pub fn clear(&self) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("dataset store lock poisoned"))?;
        let mut next = guard.clone();
        next.datasets.clear();
        persist(&self.path, &next)?;
        *guard = next;
        Ok(())
    }
}

fn persist(path: &Path, data: &DatasetFile) -> Result<()> {
    let serialized = serde_json::to_string_pretty(data)?;
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write datasets to {}", path.display()))
}

#[async_trait]
impl AutofillRepository for JsonDatasetStore {
    async fn save_collection(
        &self,
        _package_name: &str,
        collection: SavedValueCollection,
    ) -> Result<String> {
        self.save(collection)
    }

    async fn load_collections(
        &self,
        focused_hints: &[String],
        all_hints: &[String],
    ) -> Result<Option<BTreeMap<String, SavedValueCollection>>> {
        Ok(self.load(focused_hints, all_hints))
    }

    async fn clear(&self) -> Result<()> {
        JsonDatasetStore::clear(self)
    }
}
