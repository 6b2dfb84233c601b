use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, Transaction};

use crate::db::models::DefaultFieldTypeWithHints;
use crate::log_info;

const ENABLE_LOGS: bool = true;

const DEFAULT_FIELD_TYPES: &str = include_str!("default_field_types.json");

struct Migration {
    version: i32,
    schema: &'static str,
    /// Data loaded once the schema of this version exists.
    seed: Option<fn(&Transaction<'_>) -> Result<()>>,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    schema: include_str!("schemas/schema_v1.sql"),
    seed: Some(seed_default_field_types),
}];

fn latest_version() -> i32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the store to the latest schema in one transaction. A store written
/// by a newer build is refused rather than downgraded.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let current: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read dataset store version")?;
    let latest = latest_version();

    if current > latest {
        bail!("dataset store version {current} is newer than this build supports ({latest})");
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending {
        tx.execute_batch(migration.schema)
            .with_context(|| format!("failed to create schema version {}", migration.version))?;
        if let Some(seed) = migration.seed {
            seed(&tx)
                .with_context(|| format!("failed to seed schema version {}", migration.version))?;
        }
    }
    tx.pragma_update(None, "user_version", latest)?;
    tx.commit().context("failed to commit dataset schema")?;

    log_info!("Dataset store migrated from version {} to {}", current, latest);
    Ok(())
}

/// Loads the bundled field type catalog with its hints.
fn seed_default_field_types(tx: &Transaction<'_>) -> Result<()> {
    let defaults: Vec<DefaultFieldTypeWithHints> = serde_json::from_str(DEFAULT_FIELD_TYPES)
        .context("bundled field types are not valid JSON")?;

    let mut insert_type = tx.prepare(
        "INSERT OR REPLACE INTO field_types
            (type_name, autofill_types, save_info, field_partition,
             strict_example_set, text_template, date_template)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    let mut insert_hint = tx.prepare(
        "INSERT OR REPLACE INTO autofill_hints (autofill_hint, field_type_name) VALUES (?1, ?2)",
    )?;

    for DefaultFieldTypeWithHints {
        field_type,
        autofill_hints,
    } in defaults
    {
        insert_type
            .execute(params![
                field_type.type_name,
                serde_json::to_string(&field_type.autofill_types)?,
                field_type.save_info.bits(),
                field_type.partition,
                serde_json::to_string(&field_type.fake_data.strict_example_set)?,
                field_type.fake_data.text_template,
                field_type.fake_data.date_template,
            ])
            .with_context(|| format!("field type {}", field_type.type_name))?;

        for hint in &autofill_hints {
            insert_hint.execute(params![hint, field_type.type_name])?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(conn: &Connection) -> i32 {
        conn.pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap()
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn fresh_store_reaches_latest_version_with_catalog() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        assert_eq!(version(&conn), latest_version());
        assert_eq!(count(&conn, "field_types"), 12);
        assert!(count(&conn, "autofill_hints") >= 12);

        // Running again is a no-op.
        run_migrations(&mut conn).unwrap();
        assert_eq!(count(&conn, "field_types"), 12);
    }

    #[test]
    fn newer_store_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", latest_version() + 1)
            .unwrap();

        let err = run_migrations(&mut conn).unwrap_err();
        assert!(err.to_string().contains("newer than this build"));
    }
}
