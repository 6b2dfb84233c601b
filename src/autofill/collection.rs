use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::autofill::{
    catalog::{FieldCatalog, FieldKind},
    dataset::{DatasetBuilder, FillValue},
    value::SavedValue,
};
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

/// Every value captured from one submitted form, keyed by hint, plus the
/// dataset name the store assigned when it was saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedValueCollection {
    #[serde(default)]
    dataset_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_values")]
    values: BTreeMap<String, SavedValue>,
}

fn deserialize_values<'de, D>(deserializer: D) -> Result<BTreeMap<String, SavedValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Option<SavedValue>> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(hint, value)| (hint, value.unwrap_or_default()))
        .collect())
}

impl SavedValueCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(dataset_name: Option<String>, values: BTreeMap<String, SavedValue>) -> Self {
        Self {
            dataset_name,
            values,
        }
    }

    pub fn dataset_name(&self) -> Option<&str> {
        self.dataset_name.as_deref()
    }

    /// Names the collection. Stores call this once, when the collection is
    /// persisted; returns false if it already carries a name.
    pub(crate) fn assign_name(&mut self, name: String) -> bool {
        if self.dataset_name.is_some() {
            return false;
        }
        self.dataset_name = Some(name);
        true
    }

    /// Registers `value` under each hint. Hints are distinct keys, so each one
    /// gets its own entry; a hint seen again later in the same pass is replaced.
    pub fn set_value_for_hints(&mut self, hints: &[String], value: SavedValue) {
        for hint in hints {
            self.values.insert(hint.clone(), value.clone());
        }
    }

    pub fn value_for_hint(&self, hint: &str) -> Option<&SavedValue> {
        self.values.get(hint)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &SavedValue)> {
        self.values.iter().map(|(hint, value)| (hint.as_str(), value))
    }

    pub fn hints(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True iff at least one of `hints` maps to a non-empty value.
    pub fn helps_with_hints<S: AsRef<str>>(&self, hints: &[S]) -> bool {
        hints.iter().any(|hint| {
            self.values
                .get(hint.as_ref())
                .map_or(false, |value| !value.is_empty())
        })
    }

    /// Writes every matching saved value into `builder`. Returns true iff at
    /// least one field was filled; a field that cannot be matched is skipped
    /// without affecting the others.
    pub fn apply_to_fields(&self, catalog: &FieldCatalog, builder: &mut DatasetBuilder) -> bool {
        let mut set_value_at_least_once = false;

        for hint in catalog.hints() {
            let Some(saved) = self.values.get(hint) else {
                continue;
            };

            for field in catalog.fields_for_hint(hint) {
                let fill = match &field.kind {
                    FieldKind::List(_) => saved
                        .text()
                        .and_then(|text| field.option_index(text))
                        .map(FillValue::List),
                    FieldKind::Date => saved.date().map(FillValue::Date),
                    FieldKind::Text => saved.text().map(|text| FillValue::Text(text.to_string())),
                    FieldKind::Toggle => saved.toggle().map(FillValue::Toggle),
                    FieldKind::Unsupported(code) => {
                        log_warn!("Invalid autofill type {} for field {}", code, field.id);
                        None
                    }
                };

                match fill {
                    Some(value) => {
                        builder.set_value(field.id.clone(), value);
                        set_value_at_least_once = true;
                    }
                    None => {
                        log_debug!("No usable value for field {} under hint {}", field.id, hint);
                    }
                }
            }
        }

        set_value_at_least_once
    }
}
