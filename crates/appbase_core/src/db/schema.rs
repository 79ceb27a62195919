//! Additive schema sync for registered models.
//!
//! Each model gets one table named after its type. The table holds the base
//! columns followed by the model's own columns. Missing tables are created
//! and missing columns are appended; nothing else is altered.

use super::{DbError, DbResult};
use crate::model::base::{CREATED_AT_COLUMN, ID_COLUMN, UPDATED_AT_COLUMN};
use crate::model::naming::quote_ident;
use crate::registry::{ModelDescriptor, ModelRegistry};
use log::{error, info};
use rusqlite::{Connection, Transaction};
use std::collections::BTreeSet;
use std::time::Instant;

/// Outcome of syncing one model table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSync {
    pub type_name: &'static str,
    pub table_name: String,
    /// `true` when the table did not exist before this sync.
    pub created: bool,
    pub added_columns: Vec<String>,
}

/// A model whose table could not be synced.
#[derive(Debug)]
pub struct SyncFailure {
    pub type_name: &'static str,
    pub error: DbError,
}

/// Per-model results of one [`sync_schema`] run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub tables: Vec<TableSync>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// Returns whether every registered model synced.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn table(&self, type_name: &str) -> Option<&TableSync> {
        self.tables.iter().find(|table| table.type_name == type_name)
    }

    pub fn failure(&self, type_name: &str) -> Option<&SyncFailure> {
        self.failures
            .iter()
            .find(|failure| failure.type_name == type_name)
    }
}

/// Syncs every registered model, logging and collecting per-model failures.
pub fn sync_schema(conn: &mut Connection, registry: &ModelRegistry) -> SyncReport {
    let started_at = Instant::now();
    let mut report = SyncReport::default();

    for descriptor in registry.descriptors() {
        match sync_model(conn, descriptor) {
            Ok(table) => report.tables.push(table),
            Err(err) => {
                error!(
                    "event=schema_sync module=db status=error model={} table={} error={}",
                    descriptor.type_name(),
                    descriptor.table_name(),
                    err
                );
                report.failures.push(SyncFailure {
                    type_name: descriptor.type_name(),
                    error: err,
                });
            }
        }
    }

    info!(
        "event=schema_sync module=db status=done models={} failed={} duration_ms={}",
        registry.len(),
        report.failures.len(),
        started_at.elapsed().as_millis()
    );
    report
}

fn sync_model(conn: &mut Connection, descriptor: &ModelDescriptor) -> DbResult<TableSync> {
    let table_name = descriptor.table_name().to_string();
    let wrap = |source: rusqlite::Error| DbError::SchemaSync {
        table: table_name.clone(),
        source,
    };

    let tx = conn.transaction().map_err(wrap)?;
    let created = !table_exists(&tx, &table_name).map_err(wrap)?;
    let added_columns = if created {
        tx.execute_batch(&create_table_sql(descriptor))
            .map_err(wrap)?;
        Vec::new()
    } else {
        add_missing_columns(&tx, descriptor).map_err(wrap)?
    };
    tx.commit().map_err(wrap)?;

    Ok(TableSync {
        type_name: descriptor.type_name(),
        table_name: table_name.clone(),
        created,
        added_columns,
    })
}

fn table_exists(tx: &Transaction<'_>, table_name: &str) -> rusqlite::Result<bool> {
    tx.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table_name],
        |row| row.get(0),
    )
}

/// Column names lower-cased; SQLite matches column names case-insensitively.
fn existing_columns(tx: &Transaction<'_>, table_name: &str) -> rusqlite::Result<BTreeSet<String>> {
    let mut stmt = tx.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let names = stmt
        .query_map([table_name], |row| {
            row.get::<_, String>(0).map(|name| name.to_ascii_lowercase())
        })?
        .collect::<rusqlite::Result<BTreeSet<String>>>()?;
    Ok(names)
}

fn add_missing_columns(
    tx: &Transaction<'_>,
    descriptor: &ModelDescriptor,
) -> rusqlite::Result<Vec<String>> {
    let existing = existing_columns(tx, descriptor.table_name())?;
    let table = quote_ident(descriptor.table_name());
    let mut added = Vec::new();

    for column in descriptor.columns() {
        if existing.contains(&column.name.to_ascii_lowercase()) {
            continue;
        }
        tx.execute_batch(&format!(
            "ALTER TABLE {table} ADD COLUMN {};",
            column.definition_sql()
        ))?;
        added.push(column.name.to_string());
    }

    Ok(added)
}

fn create_table_sql(descriptor: &ModelDescriptor) -> String {
    let mut definitions = vec![
        format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident(ID_COLUMN)),
        format!(
            "{} INTEGER NOT NULL DEFAULT 0",
            quote_ident(CREATED_AT_COLUMN)
        ),
        format!(
            "{} INTEGER NOT NULL DEFAULT 0",
            quote_ident(UPDATED_AT_COLUMN)
        ),
    ];
    definitions.extend(
        descriptor
            .columns()
            .iter()
            .map(|column| column.definition_sql()),
    );

    format!(
        "CREATE TABLE {} (\n    {}\n);",
        quote_ident(descriptor.table_name()),
        definitions.join(",\n    ")
    )
}
