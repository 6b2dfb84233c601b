use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::autofill::{
    catalog::FieldCatalog,
    collection::SavedValueCollection,
    dataset::{Dataset, DatasetBuilder},
    hints::SaveType,
    structure::AutofillId,
};
use crate::log_debug;

const ENABLE_LOGS: bool = true;

pub const SIGN_IN_PROMPT: &str = "Sign in to autofill";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveInfo {
    pub save_type: SaveType,
    pub ids: Vec<AutofillId>,
}

/// Locks the whole response behind user authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseAuthentication {
    pub ids: Vec<AutofillId>,
    pub prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillResponse {
    pub datasets: Vec<Dataset>,
    pub save_info: Option<SaveInfo>,
    pub authentication: Option<ResponseAuthentication>,
}

/// Dataset for one saved collection, or `None` when the collection is unnamed
/// or fills nothing on this screen.
pub fn new_dataset(
    catalog: &FieldCatalog,
    collection: &SavedValueCollection,
    dataset_auth: bool,
) -> Option<Dataset> {
    let name = collection.dataset_name()?;
    let mut builder = DatasetBuilder::new(Some(name.to_string()));
    builder.set_authentication(dataset_auth);
    if collection.apply_to_fields(catalog, &mut builder) {
        Some(builder.build())
    } else {
        None
    }
}

/// Response offering one dataset per helpful collection plus save info. The
/// screen must be saveable; otherwise there is nothing to respond with.
pub fn new_response(
    catalog: &FieldCatalog,
    collections: Option<&BTreeMap<String, SavedValueCollection>>,
    dataset_auth: bool,
) -> Option<FillResponse> {
    let datasets: Vec<Dataset> = collections
        .into_iter()
        .flat_map(|map| map.values())
        .filter_map(|collection| new_dataset(catalog, collection, dataset_auth))
        .collect();

    if catalog.save_type().is_empty() {
        log_debug!("These fields are not meant to be saved by autofill");
        return None;
    }

    Some(FillResponse {
        datasets,
        save_info: Some(SaveInfo {
            save_type: catalog.save_type(),
            ids: catalog.autofill_ids(),
        }),
        authentication: None,
    })
}

/// Response that asks the user to sign in before any dataset is revealed.
pub fn locked_response(catalog: &FieldCatalog) -> Option<FillResponse> {
    if catalog.is_empty() {
        return None;
    }
    Some(FillResponse {
        datasets: Vec::new(),
        save_info: None,
        authentication: Some(ResponseAuthentication {
            ids: catalog.autofill_ids(),
            prompt: SIGN_IN_PROMPT.to_string(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autofill::{
        catalog::{FieldDescriptor, FieldKind},
        value::SavedValue,
    };

    fn catalog(hints: &[&str]) -> FieldCatalog {
        let mut catalog = FieldCatalog::new();
        for (index, hint) in hints.iter().enumerate() {
            catalog.add(FieldDescriptor::new(
                AutofillId::new(index.to_string()),
                FieldKind::Text,
                vec![hint.to_string()],
            ));
        }
        catalog
    }

    fn saved(name: Option<&str>, hint: &str, text: &str) -> SavedValueCollection {
        let mut values = BTreeMap::new();
        values.insert(hint.to_string(), SavedValue::Text(text.to_string()));
        SavedValueCollection::with_values(name.map(str::to_string), values)
    }

    #[test]
    fn unnamed_collection_is_not_offered() {
        let catalog = catalog(&["username"]);
        assert!(new_dataset(&catalog, &saved(None, "username", "alice"), false).is_none());
        let dataset = new_dataset(&catalog, &saved(Some("dataset-0"), "username", "alice"), true).unwrap();
        assert_eq!(dataset.name.as_deref(), Some("dataset-0"));
        assert!(dataset.requires_auth);
    }

    #[test]
    fn response_skips_collections_that_fill_nothing() {
        let catalog = catalog(&["username", "password"]);
        let mut collections = BTreeMap::new();
        collections.insert("dataset-0".to_string(), saved(Some("dataset-0"), "username", "alice"));
        collections.insert("dataset-1".to_string(), saved(Some("dataset-1"), "phone", "555"));

        let response = new_response(&catalog, Some(&collections), false).unwrap();
        assert_eq!(response.datasets.len(), 1);
        let save_info = response.save_info.unwrap();
        assert_eq!(save_info.ids.len(), 2);
        assert!(save_info.save_type.contains(SaveType::PASSWORD));
    }

    #[test]
    fn unsaveable_screen_has_no_response() {
        let catalog = catalog(&["phone"]);
        assert!(new_response(&catalog, None, false).is_none());
    }

    #[test]
    fn saveable_screen_without_data_still_offers_save() {
        let catalog = catalog(&["password"]);
        let response = new_response(&catalog, None, false).unwrap();
        assert!(response.datasets.is_empty());
        assert!(response.save_info.is_some());
    }

    #[test]
    fn locked_response_covers_all_ids() {
        assert!(locked_response(&FieldCatalog::new()).is_none());
        let response = locked_response(&catalog(&["username", "password"])).unwrap();
        let auth = response.authentication.unwrap();
        assert_eq!(auth.ids.len(), 2);
        assert_eq!(auth.prompt, SIGN_IN_PROMPT);
        assert!(response.datasets.is_empty());
    }
}
