//! Generic, type-checked entity persistence over SQLite.
//!
//! Entity types are registered in a [`ModelRegistry`] at startup, handed to a
//! [`Store`], and then loaded, listed, counted, saved and deleted through
//! generic operations parametrized by entity type.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod registry;
pub mod store;

pub use rusqlite;

pub use config::{StoreConfig, StoreTarget};
pub use db::{DbError, DbResult, SyncReport};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::base::{BaseModel, IdLike, ModelId};
pub use model::entity::{Column, ColumnKind, Entity, FieldType};
pub use registry::{ModelDescriptor, ModelRegistry, RegistryError};
pub use store::{Direction, Query, Store, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
