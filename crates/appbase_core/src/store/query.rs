//! Caller-held query scope for one entity type.
//!
//! A [`Query`] starts as "all rows of `T`" and is narrowed with SQLite
//! predicates before being handed by value to exactly one read operation
//! (`load_by_id_with`, `first_with`, `list_with`, `count_with`).

use crate::model::base::{CREATED_AT_COLUMN, ID_COLUMN, UPDATED_AT_COLUMN};
use crate::model::entity::Entity;
use crate::model::naming::quote_ident;
use rusqlite::types::Value;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filtered query scope for entity type `T`.
///
/// Obtained from [`Store::prepare_query`](crate::Store::prepare_query).
/// Predicates are combined with `AND`. Rows are ordered by identity
/// ascending unless `order_by` is used.
pub struct Query<T: Entity> {
    table: String,
    predicates: Vec<String>,
    params: Vec<Value>,
    order: Vec<String>,
    limit: Option<i64>,
    offset: i64,
    _model: PhantomData<fn() -> T>,
}

impl<T: Entity> Debug for Query<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("model", &T::TYPE_NAME)
            .field("table", &self.table)
            .field("predicates", &self.predicates)
            .field("params", &self.params)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T: Entity> Query<T> {
    pub(crate) fn all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            params: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: 0,
            _model: PhantomData,
        }
    }

    /// Adds a SQL predicate with positional `?` parameters.
    ///
    /// ```ignore
    /// store.prepare_query::<Widget>()?.filter("weight > ? AND weight < ?", [1.0, 5.0]);
    /// ```
    pub fn filter<I>(mut self, predicate: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.predicates.push(predicate.into());
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    /// Adds a SQL predicate without parameters, e.g. `"deleted_at IS NULL"`.
    pub fn filter_raw(mut self, predicate: impl Into<String>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    /// Adds `column = value`.
    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.predicates.push(format!("{} = ?", quote_ident(column)));
        self.params.push(value.into());
        self
    }

    /// Appends a sort key. Earlier keys take precedence.
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order
            .push(format!("{} {}", quote_ident(column), direction.as_sql()));
        self
    }

    /// Caps the row count. Values above `i64::MAX` are clamped to it.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(clamp_to_sql(limit));
        self
    }

    /// Skips leading rows. Values above `i64::MAX` are clamped to it.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = clamp_to_sql(offset);
        self
    }

    /// Builds `SELECT <base + entity columns> ...` and its bound values.
    ///
    /// `extra` is AND-ed after the caller predicates; its values follow theirs.
    pub(crate) fn into_select(self, extra: Option<(&str, Value)>) -> (String, Vec<Value>) {
        let columns = select_list::<T>();
        self.into_sql(&columns, extra)
    }

    /// Builds `SELECT COUNT(*)` over the same scope, honoring limit/offset.
    pub(crate) fn into_count(self) -> (String, Vec<Value>) {
        let (inner, params) = self.into_sql("1", None);
        (format!("SELECT COUNT(*) FROM ({inner})"), params)
    }

    fn into_sql(mut self, columns: &str, extra: Option<(&str, Value)>) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT {columns} FROM {}", quote_ident(&self.table));

        if let Some((predicate, value)) = extra {
            self.predicates.push(predicate.to_string());
            self.params.push(value);
        }
        if !self.predicates.is_empty() {
            let clauses = self
                .predicates
                .iter()
                .map(|predicate| format!("({predicate})"))
                .collect::<Vec<_>>();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        if self.order.is_empty() {
            sql.push_str(&format!(" ORDER BY {} ASC", quote_ident(ID_COLUMN)));
        } else {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), 0) => sql.push_str(&format!(" LIMIT {limit}")),
            (Some(limit), offset) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (None, 0) => {}
            (None, offset) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        }

        (sql, self.params)
    }
}

/// SQLite only accepts signed 64-bit LIMIT/OFFSET values.
fn clamp_to_sql(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn select_list<T: Entity>() -> String {
    [ID_COLUMN, CREATED_AT_COLUMN, UPDATED_AT_COLUMN]
        .into_iter()
        .chain(T::COLUMNS.iter().map(|column| column.name))
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}
