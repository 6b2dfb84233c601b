//! Persistence boundary for saved collections and package signatures.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::autofill::SavedValueCollection;
use crate::log_warn;

pub mod datasets;
pub mod verification;

pub use datasets::JsonDatasetStore;
pub use verification::PackageVerificationStore;

const ENABLE_LOGS: bool = true;

pub const DATASET_NAME_PREFIX: &str = "dataset-";

pub fn dataset_name(number: u64) -> String {
    format!("{DATASET_NAME_PREFIX}{number}")
}

/// Where saved collections live. Implementations name each collection when it
/// is saved, using a counter scoped to the store.
#[async_trait]
pub trait AutofillRepository: Send + Sync {
    /// Persists `collection` under the next `dataset-N` name and returns that name.
    async fn save_collection(
        &self,
        package_name: &str,
        collection: SavedValueCollection,
    ) -> Result<String>;

    /// Every stored collection relevant to `all_hints`, or `None` when no
    /// stored collection is relevant to `focused_hints`.
    async fn load_collections(
        &self,
        focused_hints: &[String],
        all_hints: &[String],
    ) -> Result<Option<BTreeMap<String, SavedValueCollection>>>;

    async fn clear(&self) -> Result<()>;

    /// Resource id to hint for views of `package_name` seen on earlier saves.
    /// Stores without a field type catalog remember nothing.
    async fn learned_hints(&self, _package_name: &str) -> Result<BTreeMap<String, String>> {
        Ok(BTreeMap::new())
    }

    /// Remembers the hint each resource id carried on a saved screen.
    async fn learn_hints(&self, _package_name: &str, _hints: &BTreeMap<String, String>) -> Result<()> {
        Ok(())
    }
}

/// Applies the focused-hint gate: relevance to the focused view decides whether
/// anything is returned at all, relevance to the whole screen decides what.
pub fn select_relevant<I>(
    collections: I,
    focused_hints: &[String],
    all_hints: &[String],
) -> Option<BTreeMap<String, SavedValueCollection>>
where
    I: IntoIterator<Item = SavedValueCollection>,
{
    let mut has_data_for_focused_hints = false;
    let mut relevant = BTreeMap::new();

    for collection in collections {
        if collection.helps_with_hints(focused_hints) {
            has_data_for_focused_hints = true;
        }
        if collection.helps_with_hints(all_hints) {
            match collection.dataset_name() {
                Some(name) => {
                    relevant.insert(name.to_string(), collection);
                }
                None => log_warn!("Skipping stored collection without a dataset name"),
            }
        }
    }

    if has_data_for_focused_hints {
        Some(relevant)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autofill::SavedValue;

    fn named(name: &str, entries: &[(&str, &str)]) -> SavedValueCollection {
        let values = entries
            .iter()
            .map(|(hint, text)| (hint.to_string(), SavedValue::Text(text.to_string())))
            .collect();
        SavedValueCollection::with_values(Some(name.to_string()), values)
    }

    fn hints(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn focused_hint_gates_whole_result() {
        let stored = vec![named("dataset-0", &[("username", "alice")])];
        let result = select_relevant(stored, &hints(&["password"]), &hints(&["password", "username"]));
        assert!(result.is_none());
    }

    #[test]
    fn gate_passed_returns_all_relevant() {
        let stored = vec![
            named("dataset-0", &[("username", "alice")]),
            named("dataset-1", &[("password", "hunter2")]),
            named("dataset-2", &[("phone", "555")]),
        ];
        let result = select_relevant(stored, &hints(&["password"]), &hints(&["password", "username"])).unwrap();
        assert_eq!(result.keys().cloned().collect::<Vec<_>>(), vec!["dataset-0", "dataset-1"]);
    }

    #[test]
    fn names_follow_counter() {
        assert_eq!(dataset_name(0), "dataset-0");
        assert_eq!(dataset_name(12), "dataset-12");
    }
}
