//! SQLite connection bootstrap and schema synchronization.
//!
//! # Responsibility
//! - Open and configure SQLite connections from [`StoreConfig`](crate::StoreConfig).
//! - Bring one table per registered model in line with its declared columns.
//!
//! # Invariants
//! - Schema sync only creates tables and adds columns; it never drops,
//!   renames or retypes existing ones.
//! - A failed sync for one model does not prevent syncing the others.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::open_connection;
pub use schema::{sync_schema, SyncFailure, SyncReport, TableSync};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    SchemaSync {
        table: String,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaSync { table, source } => {
                write!(f, "schema sync failed for table `{table}`: {source}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaSync { source, .. } => Some(source),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
