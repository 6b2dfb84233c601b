use serde::{Deserialize, Serialize};

use crate::autofill::structure::AutofillId;

/// Value written into one field of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum FillValue {
    Text(String),
    Toggle(bool),
    /// Index of the option to select.
    List(usize),
    Date(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFill {
    pub id: AutofillId,
    pub value: FillValue,
}

/// A named, filled set of field values offered to complete a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub name: Option<String>,
    pub values: Vec<FieldFill>,
    pub requires_auth: bool,
}

impl Dataset {
    pub fn value_for(&self, id: &AutofillId) -> Option<&FillValue> {
        self.values
            .iter()
            .find(|fill| &fill.id == id)
            .map(|fill| &fill.value)
    }
}

/// Collects field values for one dataset. Setting a value for an id that
/// already has one replaces it, so each field appears at most once.
#[derive(Debug, Clone, Default)]
pub struct DatasetBuilder {
    name: Option<String>,
    values: Vec<FieldFill>,
    requires_auth: bool,
}

impl DatasetBuilder {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn set_authentication(&mut self, requires_auth: bool) -> &mut Self {
        self.requires_auth = requires_auth;
        self
    }

    pub fn set_value(&mut self, id: AutofillId, value: FillValue) -> &mut Self {
        match self.values.iter_mut().find(|fill| fill.id == id) {
            Some(existing) => existing.value = value,
            None => self.values.push(FieldFill { id, value }),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn build(self) -> Dataset {
        Dataset {
            name: self.name,
            values: self.values,
            requires_auth: self.requires_auth,
        }
    }
}
