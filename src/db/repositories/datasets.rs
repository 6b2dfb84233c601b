use std::collections::BTreeMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Row, Transaction};
use uuid::Uuid;

use crate::autofill::{SavedValue, SavedValueCollection};
use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_i64, to_u64},
    models::{AutofillDataset, DatasetWithFilledFields, FilledField},
};
use crate::store::{dataset_name, select_relevant, AutofillRepository};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

const DATASET_COUNTER_KEY: &str = "dataset_counter";

fn row_to_dataset(row: &Row) -> Result<AutofillDataset> {
    let created_at: String = row.get("created_at")?;

    Ok(AutofillDataset {
        id: row.get("id")?,
        dataset_name: row.get("dataset_name")?,
        package_name: row.get("package_name")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn row_to_filled_field(row: &Row) -> Result<(String, FilledField)> {
    let dataset_id: String = row.get("dataset_id")?;
    let value = SavedValue::from_parts(
        row.get("text_value")?,
        row.get("date_value")?,
        row.get("toggle_value")?,
    );

    Ok((
        dataset_id,
        FilledField {
            hint: row.get("hint")?,
            value,
        },
    ))
}

fn read_counter(tx: &Transaction<'_>) -> Result<u64> {
    let value: i64 = tx.query_row(
        "SELECT value FROM store_meta WHERE key = ?1",
        params![DATASET_COUNTER_KEY],
        |row| row.get(0),
    )?;
    to_u64(value, DATASET_COUNTER_KEY)
}

fn write_counter(tx: &Transaction<'_>, value: u64) -> Result<()> {
    tx.execute(
        "INSERT OR REPLACE INTO store_meta (key, value) VALUES (?1, ?2)",
        params![DATASET_COUNTER_KEY, to_i64(value)?],
    )?;
    Ok(())
}

/// Writes one dataset row plus a filled-field row per non-empty value.
fn insert_collection(
    tx: &Transaction<'_>,
    package_name: &str,
    name: &str,
    collection: SavedValueCollection,
) -> Result<usize> {
    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO datasets (id, dataset_name, package_name, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![id, name, package_name, Utc::now().to_rfc3339()],
    )?;

    let mut written = 0;
    let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO filled_fields
            (dataset_id, hint, text_value, date_value, toggle_value)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (hint, value) in collection.values() {
        if value.is_empty() {
            continue;
        }
        let (text, date, toggle) = value.clone().into_parts();
        stmt.execute(params![id, hint, text, date, toggle])?;
        written += 1;
    }

    Ok(written)
}

impl Database {
    /// Names `collection` from the stored counter and writes it. The counter
    /// only advances when the whole write commits.
    pub async fn save_collection(
        &self,
        package_name: String,
        mut collection: SavedValueCollection,
    ) -> Result<String> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let counter = read_counter(&tx)?;
            let name = dataset_name(counter);
            if !collection.assign_name(name.clone()) {
                bail!(
                    "collection already saved as {}",
                    collection.dataset_name().unwrap_or_default()
                );
            }

            let written = insert_collection(&tx, &package_name, &name, collection)?;
            write_counter(&tx, counter + 1)?;
            tx.commit()?;

            log_info!("Saved {} for {} with {} values", name, package_name, written);
            Ok(name)
        })
        .await
    }

    /// Stores collections that already carry a name, such as generated
    /// `dataset-N.P` batches, and advances the counter once for the batch.
    pub async fn save_named_collections(
        &self,
        package_name: String,
        collections: Vec<SavedValueCollection>,
    ) -> Result<Vec<String>> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let mut names = Vec::with_capacity(collections.len());
            for collection in collections {
                let name = match collection.dataset_name() {
                    Some(name) => name.to_string(),
                    None => bail!("generated collection has no dataset name"),
                };
                insert_collection(&tx, &package_name, &name, collection)?;
                names.push(name);
            }

            if !names.is_empty() {
                let counter = read_counter(&tx)?;
                write_counter(&tx, counter + 1)?;
            }
            tx.commit()?;

            Ok(names)
        })
        .await
    }

    /// Every stored dataset with its filled fields, oldest first. Rows that
    /// fail to parse are skipped.
    pub async fn get_datasets(&self) -> Result<Vec<DatasetWithFilledFields>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT dataset_id, hint, text_value, date_value, toggle_value
                 FROM filled_fields",
            )?;
            let mut rows = stmt.query([])?;
            let mut fields_by_dataset: BTreeMap<String, Vec<FilledField>> = BTreeMap::new();
            while let Some(row) = rows.next()? {
                match row_to_filled_field(row) {
                    Ok((dataset_id, field)) => {
                        fields_by_dataset.entry(dataset_id).or_default().push(field)
                    }
                    Err(err) => log_warn!("Skipping malformed filled field: {}", err),
                }
            }

            let mut stmt = conn.prepare(
                "SELECT id, dataset_name, package_name, created_at
                 FROM datasets
                 ORDER BY created_at ASC, dataset_name ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut datasets = Vec::new();
            while let Some(row) = rows.next()? {
                match row_to_dataset(row) {
                    Ok(dataset) => {
                        let filled_fields =
                            fields_by_dataset.remove(&dataset.id).unwrap_or_default();
                        datasets.push(DatasetWithFilledFields {
                            dataset,
                            filled_fields,
                        });
                    }
                    Err(err) => log_warn!("Skipping malformed dataset row: {}", err),
                }
            }

            Ok(datasets)
        })
        .await
    }

    pub async fn load_collections(
        &self,
        focused_hints: Vec<String>,
        all_hints: Vec<String>,
    ) -> Result<Option<BTreeMap<String, SavedValueCollection>>> {
        let datasets = self.get_datasets().await?;
        let collections = datasets
            .into_iter()
            .map(DatasetWithFilledFields::into_collection);
        Ok(select_relevant(collections, &focused_hints, &all_hints))
    }

    /// Number the next saved collection will receive.
    pub async fn dataset_number(&self) -> Result<u64> {
        self.execute(|conn| {
            let value: i64 = conn.query_row(
                "SELECT value FROM store_meta WHERE key = ?1",
                params![DATASET_COUNTER_KEY],
                |row| row.get(0),
            )?;
            to_u64(value, DATASET_COUNTER_KEY)
        })
        .await
    }

    /// Deletes every dataset and restarts naming at `dataset-0`. Field types stay.
    pub async fn clear_datasets(&self) -> Result<()> {
        self.execute(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM filled_fields", [])?;
            tx.execute("DELETE FROM datasets", [])?;
            write_counter(&tx, 0)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl AutofillRepository for Database {
    async fn save_collection(
        &self,
        package_name: &str,
        collection: SavedValueCollection,
    ) -> Result<String> {
        Database::save_collection(self, package_name.to_string(), collection).await
    }

    async fn load_collections(
        &self,
        focused_hints: &[String],
        all_hints: &[String],
    ) -> Result<Option<BTreeMap<String, SavedValueCollection>>> {
        Database::load_collections(self, focused_hints.to_vec(), all_hints.to_vec()).await
    }

    async fn clear(&self) -> Result<()> {
        self.clear_datasets().await
    }

    async fn learned_hints(&self, package_name: &str) -> Result<BTreeMap<String, String>> {
        self.get_learned_hints(package_name.to_string()).await
    }

    async fn learn_hints(&self, package_name: &str, hints: &BTreeMap<String, String>) -> Result<()> {
        self.learn_resource_id_hints(package_name.to_string(), hints.clone())
            .await
            .map(|_| ())
    }
}
