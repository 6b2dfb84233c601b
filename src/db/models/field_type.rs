//! Field type catalog rows.
//!
//! A field type groups the hints that mean the same thing ("postalCode",
//! "zipCode") and carries what the fake data builder needs to invent a value.

use serde::{Deserialize, Serialize};

use crate::autofill::SaveType;

pub const PARTITION_ALL: i32 = -1;
pub const PARTITION_OTHER: i32 = 0;
pub const PARTITION_ADDRESS: i32 = 1;
pub const PARTITION_EMAIL: i32 = 2;
pub const PARTITION_CREDIT_CARD: i32 = 3;

pub const PARTITIONS: [i32; 4] = [
    PARTITION_OTHER,
    PARTITION_ADDRESS,
    PARTITION_EMAIL,
    PARTITION_CREDIT_CARD,
];

/// Placeholders understood by text and date templates.
pub const SEED_PLACEHOLDER: &str = "seed";
pub const CURRENT_TIME_PLACEHOLDER: &str = "curr_time";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FakeData {
    pub strict_example_set: Vec<String>,
    pub text_template: Option<String>,
    pub date_template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldType {
    pub type_name: String,
    pub autofill_types: Vec<i32>,
    pub save_info: SaveType,
    pub partition: i32,
    #[serde(default)]
    pub fake_data: FakeData,
}

impl FieldType {
    /// `PARTITION_ALL` on either side matches every partition.
    pub fn matches_partition(&self, partition: i32) -> bool {
        partition == PARTITION_ALL || self.partition == PARTITION_ALL || self.partition == partition
    }
}

/// Entry of the bundled defaults file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultFieldTypeWithHints {
    pub autofill_hints: Vec<String>,
    pub field_type: FieldType,
}

/// A field type together with every hint mapped to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldTypeWithHints {
    pub field_type: FieldType,
    pub autofill_hints: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_defaults_parse() {
        let defaults: Vec<DefaultFieldTypeWithHints> =
            serde_json::from_str(include_str!("../default_field_types.json")).unwrap();
        assert!(!defaults.is_empty());
        assert!(defaults
            .iter()
            .all(|entry| !entry.autofill_hints.is_empty()));
        assert!(defaults
            .iter()
            .all(|entry| PARTITIONS.contains(&entry.field_type.partition)));
    }

    #[test]
    fn all_partition_matches_everything() {
        let field_type = FieldType {
            type_name: "phone".into(),
            autofill_types: vec![1],
            save_info: SaveType::GENERIC,
            partition: PARTITION_ADDRESS,
            fake_data: FakeData::default(),
        };
        assert!(field_type.matches_partition(PARTITION_ALL));
        assert!(field_type.matches_partition(PARTITION_ADDRESS));
        assert!(!field_type.matches_partition(PARTITION_EMAIL));
    }

    #[test]
    fn type_in_all_partitions_matches_any_request() {
        let field_type = FieldType {
            type_name: "phone".into(),
            autofill_types: vec![1],
            save_info: SaveType::GENERIC,
            partition: PARTITION_ALL,
            fake_data: FakeData::default(),
        };
        assert!(PARTITIONS
            .iter()
            .all(|partition| field_type.matches_partition(*partition)));
    }
}
