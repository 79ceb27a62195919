//! Generic load/save/delete/list/count over registered entities.
//!
//! Every soft operation is a thin wrapper over its `try_*` counterpart that
//! logs the failure cause and returns the empty value (`None`, empty `Vec`,
//! `0`, `false`).

use super::query::Query;
use super::{log_failure, Store, StoreError, StoreResult};
use crate::model::base::{
    now_epoch_ms, IdLike, ModelId, CREATED_AT_COLUMN, ID_COLUMN, UPDATED_AT_COLUMN,
};
use crate::model::entity::Entity;
use crate::model::naming::quote_ident;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, ToSql};
use std::fmt::Debug;

impl Store {
    /// Starts a query scoped to all rows of `T`.
    ///
    /// Returns `None` when the store is closed or `T` is not registered.
    pub fn prepare_query<T: Entity>(&self) -> Option<Query<T>> {
        self.try_prepare_query::<T>()
            .map_err(|err| log_failure("prepare_query", T::TYPE_NAME, &err))
            .ok()
    }

    pub fn try_prepare_query<T: Entity>(&self) -> StoreResult<Query<T>> {
        let descriptor = self.ensure_model::<T>()?;
        Ok(Query::all(descriptor.table_name()))
    }

    /// Loads `T` by identity. Identity `0` and non-numeric input yield `None`.
    pub fn load_by_id<T: Entity>(&self, id: impl IdLike) -> Option<T> {
        soften(
            "load_by_id",
            T::TYPE_NAME,
            self.try_load_by_id::<T>(id).map(Some),
        )
    }

    /// Like [`load_by_id`](Self::load_by_id), restricted to `query`.
    pub fn load_by_id_with<T: Entity>(&self, query: Query<T>, id: impl IdLike) -> Option<T> {
        soften(
            "load_by_id",
            T::TYPE_NAME,
            self.try_load_by_id_with(query, id).map(Some),
        )
    }

    /// Loads `T` by identity for call sites where absence is a bug.
    ///
    /// # Panics
    /// - Panics when the entity cannot be loaded for any reason.
    pub fn load_by_id_strict<T: Entity, I: IdLike + Debug>(&self, id: I) -> T {
        match self.try_load_by_id::<T>(&id) {
            Ok(entity) => entity,
            Err(err) => panic!("cannot load model object {}[id={id:?}]: {err}", T::TYPE_NAME),
        }
    }

    /// Returns a fresh unsaved `T` for identity `0`, otherwise loads by identity.
    ///
    /// Returns `None` only when `id` is not numeric or the load fails.
    pub fn load_or_create<T: Entity>(&self, id: impl IdLike) -> Option<T> {
        match id.to_model_id() {
            None => {
                debug!(
                    "event=load_or_create module=store status=empty model={} reason=invalid_identity",
                    T::TYPE_NAME
                );
                None
            }
            Some(0) => Some(T::default()),
            Some(id) => self.load_by_id(id),
        }
    }

    /// First row of `T` by identity order.
    pub fn first<T: Entity>(&self) -> Option<T> {
        soften("first", T::TYPE_NAME, self.try_first::<T>().map(Some))
    }

    pub fn first_with<T: Entity>(&self, query: Query<T>) -> Option<T> {
        soften("first", T::TYPE_NAME, self.try_first_with(query).map(Some))
    }

    /// All rows of `T`; empty on no match or on error.
    pub fn list<T: Entity>(&self) -> Vec<T> {
        soften("list", T::TYPE_NAME, self.try_list::<T>())
    }

    pub fn list_with<T: Entity>(&self, query: Query<T>) -> Vec<T> {
        soften("list", T::TYPE_NAME, self.try_list_with(query))
    }

    /// Number of rows of `T`; `0` on error as well as on an empty table.
    ///
    /// Use [`try_count`](Self::try_count) to tell the two apart.
    pub fn count<T: Entity>(&self) -> u64 {
        soften("count", T::TYPE_NAME, self.try_count::<T>())
    }

    pub fn count_with<T: Entity>(&self, query: Query<T>) -> u64 {
        soften("count", T::TYPE_NAME, self.try_count_with(query))
    }

    /// Inserts (identity `0`) or updates `entity`; returns whether it was stored.
    ///
    /// On insert the new identity and timestamps are written back to `entity`.
    pub fn save<T: Entity>(&self, entity: &mut T) -> bool {
        self.try_save(entity)
            .map_err(|err| log_failure("save", T::TYPE_NAME, &err))
            .is_ok()
    }

    /// Deletes `entity` by identity; returns whether the row is gone.
    ///
    /// A row that is already absent counts as deleted. Unsaved entities fail.
    pub fn delete<T: Entity>(&self, entity: &T) -> bool {
        self.try_delete(entity)
            .map_err(|err| log_failure("delete", T::TYPE_NAME, &err))
            .is_ok()
    }

    pub fn try_load_by_id<T: Entity>(&self, id: impl IdLike) -> StoreResult<T> {
        let query = self.try_prepare_query::<T>()?;
        self.try_load_by_id_with(query, id)
    }

    pub fn try_load_by_id_with<T: Entity>(
        &self,
        query: Query<T>,
        id: impl IdLike,
    ) -> StoreResult<T> {
        self.ensure_model::<T>()?;
        let id = id.to_model_id().ok_or(StoreError::InvalidIdentity {
            type_name: T::TYPE_NAME,
        })?;
        let not_found = StoreError::NotFound {
            type_name: T::TYPE_NAME,
            id: Some(id),
        };
        if id == 0 {
            return Err(not_found);
        }

        let id_predicate = format!("{} = ?", quote_ident(ID_COLUMN));
        let (sql, params) = query.into_select(Some((id_predicate.as_str(), Value::Integer(id))));
        let conn = self.connection()?;
        query_one::<T>(&conn, &sql, params)?.ok_or(not_found)
    }

    pub fn try_first<T: Entity>(&self) -> StoreResult<T> {
        let query = self.try_prepare_query::<T>()?;
        self.try_first_with(query)
    }

    pub fn try_first_with<T: Entity>(&self, query: Query<T>) -> StoreResult<T> {
        self.ensure_model::<T>()?;
        let (sql, params) = query.limit(1).into_select(None);
        let conn = self.connection()?;
        query_one::<T>(&conn, &sql, params)?.ok_or(StoreError::NotFound {
            type_name: T::TYPE_NAME,
            id: None,
        })
    }

    pub fn try_list<T: Entity>(&self) -> StoreResult<Vec<T>> {
        let query = self.try_prepare_query::<T>()?;
        self.try_list_with(query)
    }

    pub fn try_list_with<T: Entity>(&self, query: Query<T>) -> StoreResult<Vec<T>> {
        self.ensure_model::<T>()?;
        let (sql, params) = query.into_select(None);
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| T::from_row(row))?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    pub fn try_count<T: Entity>(&self) -> StoreResult<u64> {
        let query = self.try_prepare_query::<T>()?;
        self.try_count_with(query)
    }

    pub fn try_count_with<T: Entity>(&self, query: Query<T>) -> StoreResult<u64> {
        self.ensure_model::<T>()?;
        let (sql, params) = query.into_count();
        let conn = self.connection()?;
        let count: i64 = conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Upserts `entity`.
    ///
    /// - Identity `0`: inserts, then assigns identity and timestamps.
    /// - Otherwise: updates by identity and reads back the stored creation
    ///   time; when no row has that identity the entity is inserted under it.
    pub fn try_save<T: Entity>(&self, entity: &mut T) -> StoreResult<()> {
        let descriptor = self.ensure_model::<T>()?;
        let table = quote_ident(descriptor.table_name());
        let conn = self.connection()?;
        let now = now_epoch_ms();

        let base = *entity.base();
        let created_at = if base.created_at == 0 {
            now
        } else {
            base.created_at
        };

        let (id, created_at) = if base.is_new() {
            let id = insert_row(&conn, &table, &*entity, None, created_at, now)?;
            (id, created_at)
        } else if let Some(stored_created_at) = update_row(&conn, &table, &*entity, now)? {
            (base.id, stored_created_at)
        } else {
            debug!(
                "event=save module=store status=insert_missing model={} id={}",
                T::TYPE_NAME,
                base.id
            );
            let id = insert_row(&conn, &table, &*entity, Some(base.id), created_at, now)?;
            (id, created_at)
        };

        let stored = entity.base_mut();
        stored.id = id;
        stored.created_at = created_at;
        stored.updated_at = now;
        Ok(())
    }

    pub fn try_delete<T: Entity>(&self, entity: &T) -> StoreResult<()> {
        let descriptor = self.ensure_model::<T>()?;
        if entity.is_new() {
            return Err(StoreError::UnsavedEntity {
                type_name: T::TYPE_NAME,
            });
        }

        let conn = self.connection()?;
        let removed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1;",
                quote_ident(descriptor.table_name()),
                quote_ident(ID_COLUMN)
            ),
            [entity.id()],
        )?;
        if removed == 0 {
            debug!(
                "event=delete module=store status=already_absent model={} id={}",
                T::TYPE_NAME,
                entity.id()
            );
        }
        Ok(())
    }
}

fn soften<R: Default>(op: &'static str, type_name: &str, result: StoreResult<R>) -> R {
    result.unwrap_or_else(|err| {
        log_failure(op, type_name, &err);
        R::default()
    })
}

fn query_one<T: Entity>(conn: &Connection, sql: &str, params: Vec<Value>) -> StoreResult<Option<T>> {
    let entity = conn
        .query_row(sql, params_from_iter(params), |row| T::from_row(row))
        .optional()?;
    Ok(entity)
}

fn insert_row<T: Entity>(
    conn: &Connection,
    table: &str,
    entity: &T,
    id: Option<ModelId>,
    created_at: i64,
    updated_at: i64,
) -> rusqlite::Result<ModelId> {
    let mut columns: Vec<&str> = Vec::with_capacity(T::COLUMNS.len() + 3);
    let mut values: Vec<&dyn ToSql> = Vec::with_capacity(T::COLUMNS.len() + 3);

    if let Some(id) = id.as_ref() {
        columns.push(ID_COLUMN);
        values.push(id);
    }
    columns.push(CREATED_AT_COLUMN);
    values.push(&created_at);
    columns.push(UPDATED_AT_COLUMN);
    values.push(&updated_at);
    columns.extend(T::COLUMNS.iter().map(|column| column.name));
    values.extend(entity.field_values());

    let column_list = columns
        .iter()
        .map(|column| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=values.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");

    conn.execute(
        &format!("INSERT INTO {table} ({column_list}) VALUES ({placeholders});"),
        params_from_iter(values),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns the stored `created_at`, or `None` when no row has the entity's identity.
fn update_row<T: Entity>(
    conn: &Connection,
    table: &str,
    entity: &T,
    updated_at: i64,
) -> rusqlite::Result<Option<i64>> {
    let id = entity.id();
    let mut assignments = vec![format!("{} = ?1", quote_ident(UPDATED_AT_COLUMN))];
    let mut values: Vec<&dyn ToSql> = vec![&updated_at as &dyn ToSql];

    for (column, value) in T::COLUMNS.iter().zip(entity.field_values()) {
        values.push(value);
        assignments.push(format!("{} = ?{}", quote_ident(column.name), values.len()));
    }
    values.push(&id);

    conn.query_row(
        &format!(
            "UPDATE {table} SET {} WHERE {} = ?{} RETURNING {};",
            assignments.join(", "),
            quote_ident(ID_COLUMN),
            values.len(),
            quote_ident(CREATED_AT_COLUMN)
        ),
        params_from_iter(values),
        |row| row.get(0),
    )
    .optional()
}
