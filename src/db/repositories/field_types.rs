use std::collections::BTreeMap;

use anyhow::Result;
use rusqlite::{params, Connection, Row};

use crate::autofill::SaveType;
use crate::db::{
    connection::Database,
    helpers::parse_json_column,
    models::{FakeData, FieldType, FieldTypeWithHints},
};
use crate::log_warn;

const ENABLE_LOGS: bool = true;

const FIELD_TYPE_COLUMNS: &str = "type_name, autofill_types, save_info, field_partition,
     strict_example_set, text_template, date_template";

pub(crate) fn row_to_field_type(row: &Row) -> Result<FieldType> {
    let autofill_types: String = row.get("autofill_types")?;
    let strict_example_set: String = row.get("strict_example_set")?;

    Ok(FieldType {
        type_name: row.get("type_name")?,
        autofill_types: parse_json_column(&autofill_types, "autofill_types")?,
        save_info: SaveType::from_bits(row.get("save_info")?),
        partition: row.get("field_partition")?,
        fake_data: FakeData {
            strict_example_set: parse_json_column(&strict_example_set, "strict_example_set")?,
            text_template: row.get("text_template")?,
            date_template: row.get("date_template")?,
        },
    })
}

/// Field type columns qualified with a table alias, for joins.
pub(crate) fn field_type_columns(alias: &str) -> String {
    FIELD_TYPE_COLUMNS
        .split(',')
        .map(|column| format!("{alias}.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn hints_by_type(conn: &Connection) -> Result<BTreeMap<String, Vec<String>>> {
    let mut stmt = conn.prepare(
        "SELECT autofill_hint, field_type_name FROM autofill_hints ORDER BY autofill_hint ASC",
    )?;
    let mut rows = stmt.query([])?;
    let mut hints: BTreeMap<String, Vec<String>> = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let hint: String = row.get(0)?;
        let type_name: String = row.get(1)?;
        hints.entry(type_name).or_default().push(hint);
    }
    Ok(hints)
}

impl Database {
    /// Every field type with its hints, ordered by type name.
    pub async fn get_field_types(&self) -> Result<Vec<FieldTypeWithHints>> {
        self.execute(|conn| {
            let mut hints = hints_by_type(conn)?;

            let sql = format!("SELECT {FIELD_TYPE_COLUMNS} FROM field_types ORDER BY type_name ASC");
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            let mut field_types = Vec::new();
            while let Some(row) = rows.next()? {
                match row_to_field_type(row) {
                    Ok(field_type) => {
                        let autofill_hints =
                            hints.remove(&field_type.type_name).unwrap_or_default();
                        field_types.push(FieldTypeWithHints {
                            field_type,
                            autofill_hints,
                        });
                    }
                    Err(err) => log_warn!("Skipping malformed field type: {}", err),
                }
            }

            Ok(field_types)
        })
        .await
    }

    pub async fn get_field_type(&self, type_name: String) -> Result<Option<FieldType>> {
        self.execute(move |conn| {
            let sql = format!("SELECT {FIELD_TYPE_COLUMNS} FROM field_types WHERE type_name = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![type_name])?;
            let field_type = match rows.next()? {
                Some(row) => Some(row_to_field_type(row)?),
                None => None,
            };
            Ok(field_type)
        })
        .await
    }

    /// Field type of each known hint.
    pub async fn get_field_types_by_hint(&self) -> Result<BTreeMap<String, FieldType>> {
        self.execute(|conn| {
            let sql = format!(
                "SELECT h.autofill_hint, {}
                 FROM autofill_hints h
                 JOIN field_types f ON f.type_name = h.field_type_name",
                field_type_columns("f")
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            let mut by_hint = BTreeMap::new();
            while let Some(row) = rows.next()? {
                let hint: String = row.get("autofill_hint")?;
                match row_to_field_type(row) {
                    Ok(field_type) => {
                        by_hint.insert(hint, field_type);
                    }
                    Err(err) => log_warn!("Skipping hint {} with malformed field type: {}", hint, err),
                }
            }
            Ok(by_hint)
        })
        .await
    }
}
