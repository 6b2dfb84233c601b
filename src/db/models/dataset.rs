use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::autofill::{SavedValue, SavedValueCollection};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutofillDataset {
    pub id: String,
    pub dataset_name: String,
    pub package_name: String,
    pub created_at: DateTime<Utc>,
}

/// One `filled_fields` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilledField {
    pub hint: String,
    pub value: SavedValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetWithFilledFields {
    pub dataset: AutofillDataset,
    pub filled_fields: Vec<FilledField>,
}

impl DatasetWithFilledFields {
    pub fn into_collection(self) -> SavedValueCollection {
        let values: BTreeMap<String, SavedValue> = self
            .filled_fields
            .into_iter()
            .map(|field| (field.hint, field.value))
            .collect();
        SavedValueCollection::with_values(Some(self.dataset.dataset_name), values)
    }
}
