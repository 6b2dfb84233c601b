use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    models::{FieldType, ResourceIdHeuristic},
    repositories::field_types::{field_type_columns, row_to_field_type},
};
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

fn row_to_heuristic(row: &Row) -> Result<ResourceIdHeuristic> {
    Ok(ResourceIdHeuristic {
        resource_id: row.get("resource_id")?,
        package_name: row.get("package_name")?,
        field_type_name: row.get("field_type_name")?,
    })
}

impl Database {
    /// Records (or replaces) the field type behind a package's resource id.
    /// Fails when the field type is unknown.
    pub async fn save_resource_id_heuristic(&self, heuristic: ResourceIdHeuristic) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO resource_id_heuristics
                    (resource_id, package_name, field_type_name)
                 VALUES (?1, ?2, ?3)",
                params![
                    heuristic.resource_id,
                    heuristic.package_name,
                    heuristic.field_type_name
                ],
            )
            .with_context(|| {
                format!(
                    "failed to record {} as {} for {}",
                    heuristic.resource_id, heuristic.field_type_name, heuristic.package_name
                )
            })?;
            Ok(())
        })
        .await
    }

    pub async fn get_resource_id_heuristics(
        &self,
        package_name: String,
    ) -> Result<Vec<ResourceIdHeuristic>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT resource_id, package_name, field_type_name
                 FROM resource_id_heuristics
                 WHERE package_name = ?1
                 ORDER BY resource_id ASC",
            )?;
            let mut rows = stmt.query(params![package_name])?;
            let mut heuristics = Vec::new();
            while let Some(row) = rows.next()? {
                heuristics.push(row_to_heuristic(row)?);
            }
            Ok(heuristics)
        })
        .await
    }

    pub async fn get_field_type_for_resource_id(
        &self,
        package_name: String,
        resource_id: String,
    ) -> Result<Option<FieldType>> {
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {}
                 FROM resource_id_heuristics r
                 JOIN field_types f ON f.type_name = r.field_type_name
                 WHERE r.package_name = ?1 AND r.resource_id = ?2",
                field_type_columns("f")
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![package_name, resource_id])?;
            let field_type = match rows.next()? {
                Some(row) => Some(row_to_field_type(row)?),
                None => None,
            };
            Ok(field_type)
        })
        .await
    }

    /// Resource id to a hint of its recorded field type, for one package.
    pub async fn get_learned_hints(&self, package_name: String) -> Result<BTreeMap<String, String>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT r.resource_id, MIN(h.autofill_hint)
                 FROM resource_id_heuristics r
                 JOIN autofill_hints h ON h.field_type_name = r.field_type_name
                 WHERE r.package_name = ?1
                 GROUP BY r.resource_id",
            )?;
            let mut rows = stmt.query(params![package_name])?;
            let mut learned = BTreeMap::new();
            while let Some(row) = rows.next()? {
                learned.insert(row.get(0)?, row.get(1)?);
            }
            Ok(learned)
        })
        .await
    }

    /// Maps each hint to its field type and records it for the resource id.
    /// Hints without a field type are skipped. Returns how many were recorded.
    pub async fn learn_resource_id_hints(
        &self,
        package_name: String,
        hints: BTreeMap<String, String>,
    ) -> Result<usize> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut recorded = 0;
            for (resource_id, hint) in &hints {
                let field_type_name: Option<String> = tx
                    .query_row(
                        "SELECT field_type_name FROM autofill_hints WHERE autofill_hint = ?1",
                        params![hint],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(field_type_name) = field_type_name else {
                    log_debug!("No field type for hint {}; not learning {}", hint, resource_id);
                    continue;
                };
                tx.execute(
                    "INSERT OR REPLACE INTO resource_id_heuristics
                        (resource_id, package_name, field_type_name)
                     VALUES (?1, ?2, ?3)",
                    params![resource_id, package_name, field_type_name],
                )?;
                recorded += 1;
            }
            tx.commit()?;

            if recorded > 0 {
                log_info!("Learned {} resource ids for {}", recorded, package_name);
            }
            Ok(recorded)
        })
        .await
    }
}
