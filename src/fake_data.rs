//! Synthetic datasets for exercising the service without real user data.

use chrono::Utc;
use rand::Rng;

use crate::autofill::{SavedValue, SavedValueCollection};
use crate::db::models::{
    field_type::{CURRENT_TIME_PLACEHOLDER, SEED_PLACEHOLDER},
    FieldType, FieldTypeWithHints, PARTITIONS,
};
use crate::log_debug;
use crate::store::dataset_name;

const ENABLE_LOGS: bool = true;

/// Seeds are kept small so generated values stay readable.
const MAX_RANDOM_SEED: u32 = 10_000;

pub fn random_seed() -> u32 {
    rand::thread_rng().gen_range(0..MAX_RANDOM_SEED)
}

/// Fake value for one field type. Strict example sets win over text
/// templates, which win over date templates.
pub fn fake_value(field_type: &FieldType, seed: u32, now_millis: i64) -> SavedValue {
    let fake_data = &field_type.fake_data;
    let examples = &fake_data.strict_example_set;

    if examples.first().is_some_and(|first| !first.is_empty()) {
        let index = seed as usize % examples.len();
        return SavedValue::Text(examples[index].clone());
    }

    if let Some(template) = &fake_data.text_template {
        let text = template
            .replace(SEED_PLACEHOLDER, &seed.to_string())
            .replace(CURRENT_TIME_PLACEHOLDER, &now_millis.to_string());
        return SavedValue::Text(text);
    }

    match &fake_data.date_template {
        Some(template) if template.contains(CURRENT_TIME_PLACEHOLDER) => {
            SavedValue::Date(now_millis)
        }
        _ => SavedValue::Empty,
    }
}

pub struct FakeDataBuilder {
    field_types: Vec<FieldTypeWithHints>,
}

impl FakeDataBuilder {
    pub fn new(field_types: Vec<FieldTypeWithHints>) -> Self {
        Self { field_types }
    }

    /// One collection per partition, named `dataset-<number>.<partition>`.
    /// Each value is registered under every hint of its field type. Partitions
    /// that end up without values are left out.
    pub fn build_collections_by_partition(
        &self,
        dataset_number: u64,
        seed: u32,
    ) -> Vec<SavedValueCollection> {
        let now_millis = Utc::now().timestamp_millis();
        let base_name = dataset_name(dataset_number);

        PARTITIONS
            .iter()
            .filter_map(|&partition| {
                let mut collection = SavedValueCollection::new();
                for entry in &self.field_types {
                    if !entry.field_type.matches_partition(partition) {
                        continue;
                    }
                    let value = fake_value(&entry.field_type, seed, now_millis);
                    if value.is_empty() {
                        continue;
                    }
                    collection.set_value_for_hints(&entry.autofill_hints, value);
                }

                if collection.is_empty() {
                    return None;
                }
                let name = format!("{base_name}.{partition}");
                log_debug!("Generated {} with {} values", name, collection.len());
                collection.assign_name(name);
                Some(collection)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autofill::SaveType;
    use crate::db::models::{
        FakeData, PARTITION_ADDRESS, PARTITION_ALL, PARTITION_CREDIT_CARD, PARTITION_OTHER,
    };

    fn field_type(name: &str, partition: i32, fake_data: FakeData) -> FieldType {
        FieldType {
            type_name: name.into(),
            autofill_types: vec![1],
            save_info: SaveType::GENERIC,
            partition,
            fake_data,
        }
    }

    fn with_hints(field_type: FieldType, hints: &[&str]) -> FieldTypeWithHints {
        FieldTypeWithHints {
            field_type,
            autofill_hints: hints.iter().map(|h| h.to_string()).collect(),
        }
    }

    #[test]
    fn strict_examples_are_picked_by_seed() {
        let ty = field_type(
            "month",
            PARTITION_CREDIT_CARD,
            FakeData {
                strict_example_set: vec!["01".into(), "02".into(), "03".into()],
                text_template: Some("ignored".into()),
                date_template: None,
            },
        );
        assert_eq!(fake_value(&ty, 4, 0), SavedValue::Text("02".into()));
    }

    #[test]
    fn text_template_substitutes_seed_and_time() {
        let ty = field_type(
            "username",
            PARTITION_OTHER,
            FakeData {
                text_template: Some("user-seed-curr_time".into()),
                ..FakeData::default()
            },
        );
        assert_eq!(fake_value(&ty, 7, 1234), SavedValue::Text("user-7-1234".into()));
    }

    #[test]
    fn date_template_uses_current_time() {
        let ty = field_type(
            "expiry",
            PARTITION_CREDIT_CARD,
            FakeData {
                date_template: Some("curr_time".into()),
                ..FakeData::default()
            },
        );
        assert_eq!(fake_value(&ty, 0, 99), SavedValue::Date(99));

        let blank = field_type("blank", PARTITION_OTHER, FakeData::default());
        assert_eq!(fake_value(&blank, 0, 99), SavedValue::Empty);
    }

    #[test]
    fn collections_are_split_by_partition() {
        let builder = FakeDataBuilder::new(vec![
            with_hints(
                field_type(
                    "username",
                    PARTITION_OTHER,
                    FakeData {
                        text_template: Some("userseed".into()),
                        ..FakeData::default()
                    },
                ),
                &["username"],
            ),
            with_hints(
                field_type(
                    "postalCode",
                    PARTITION_ADDRESS,
                    FakeData {
                        strict_example_set: vec!["94043".into()],
                        ..FakeData::default()
                    },
                ),
                &["postalCode", "zipCode"],
            ),
            with_hints(field_type("blank", PARTITION_CREDIT_CARD, FakeData::default()), &["x"]),
        ]);

        let collections = builder.build_collections_by_partition(3, 5);
        let names: Vec<_> = collections
            .iter()
            .map(|c| c.dataset_name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["dataset-3.0", "dataset-3.1"]);

        assert_eq!(
            collections[0].value_for_hint("username"),
            Some(&SavedValue::Text("user5".into()))
        );
        assert_eq!(
            collections[1].value_for_hint("zipCode"),
            Some(&SavedValue::Text("94043".into()))
        );
    }

    #[test]
    fn type_in_all_partitions_lands_in_every_collection() {
        let builder = FakeDataBuilder::new(vec![
            with_hints(
                field_type(
                    "phone",
                    PARTITION_ALL,
                    FakeData {
                        text_template: Some("555-seed".into()),
                        ..FakeData::default()
                    },
                ),
                &["phone"],
            ),
            with_hints(
                field_type(
                    "postalCode",
                    PARTITION_ADDRESS,
                    FakeData {
                        strict_example_set: vec!["94043".into()],
                        ..FakeData::default()
                    },
                ),
                &["postalCode"],
            ),
        ]);

        let collections = builder.build_collections_by_partition(0, 7);
        assert_eq!(collections.len(), 4);
        assert!(collections
            .iter()
            .all(|c| c.value_for_hint("phone") == Some(&SavedValue::Text("555-7".into()))));
        assert_eq!(
            collections
                .iter()
                .filter(|c| c.value_for_hint("postalCode").is_some())
                .count(),
            1
        );
    }
}
