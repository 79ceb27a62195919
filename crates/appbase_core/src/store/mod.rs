//! Connection handle and generic entity access.
//!
//! # Responsibility
//! - Own the optional live SQLite connection and its open/close lifecycle.
//! - Gate every entity operation on "store is open" and "type is registered".
//!
//! # Invariants
//! - `open`/`close` take `&mut self`, so they cannot race in-flight operations.
//! - Entity operations take `&self` and serialize access to the connection.
//! - Soft operations never panic on a closed store or an unregistered type;
//!   they log and return an empty result. `try_*` variants return the cause.

use crate::config::StoreConfig;
use crate::db::{open_connection, sync_schema, DbError, DbResult, SyncReport};
use crate::model::base::ModelId;
use crate::model::entity::Entity;
use crate::registry::{ModelDescriptor, ModelRegistry};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};

mod crud;
pub mod query;

pub use query::{Direction, Query};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure causes of entity operations.
#[derive(Debug)]
pub enum StoreError {
    /// The store is closed.
    ConnectionUnavailable,
    /// The connection is already held by `with_connection` on this thread.
    ConnectionInUse,
    Unregistered(&'static str),
    /// No row matched. `id` is set for identity lookups.
    NotFound {
        type_name: &'static str,
        id: Option<ModelId>,
    },
    /// The identity argument could not be coerced to a numeric id.
    InvalidIdentity { type_name: &'static str },
    /// Delete was called on an entity that was never saved.
    UnsavedEntity { type_name: &'static str },
    Db(DbError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionUnavailable => write!(f, "database is not open"),
            Self::ConnectionInUse => write!(
                f,
                "database connection is held by with_connection on this thread"
            ),
            Self::Unregistered(type_name) => write!(f, "unknown model `{type_name}`"),
            Self::NotFound {
                type_name,
                id: Some(id),
            } => write!(f, "{type_name}[id={id}] not found"),
            Self::NotFound {
                type_name,
                id: None,
            } => write!(f, "no {type_name} matched the query"),
            Self::InvalidIdentity { type_name } => {
                write!(f, "identity for {type_name} is not numeric")
            }
            Self::UnsavedEntity { type_name } => {
                write!(f, "{type_name} has id=0 and was never saved")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Process-owned handle to the backing database.
///
/// Starts closed. [`open`](Self::open) connects and syncs the schema of
/// every registered model; [`close`](Self::close) releases the connection.
pub struct Store {
    config: StoreConfig,
    registry: ModelRegistry,
    conn: Option<Mutex<Connection>>,
    sync_report: Option<SyncReport>,
}

impl Store {
    pub fn new(config: StoreConfig, registry: ModelRegistry) -> Self {
        Self {
            config,
            registry,
            conn: None,
            sync_report: None,
        }
    }

    /// Opens the connection and syncs schema for all registered models.
    ///
    /// Per-model sync failures are logged and reported through
    /// [`last_sync_report`](Self::last_sync_report); they do not fail the open.
    /// Opening an already open store is a no-op.
    ///
    /// # Errors
    /// - Returns an error when the connection cannot be established or configured.
    pub fn open(&mut self) -> DbResult<()> {
        if self.conn.is_some() {
            warn!("event=store_open module=store status=skipped reason=already_open");
            return Ok(());
        }

        let mut conn = open_connection(&self.config)?;
        let report = sync_schema(&mut conn, &self.registry);
        info!(
            "event=store_open module=store status=ok mode={} models={} sync_failures={}",
            self.config.target.mode(),
            self.registry.len(),
            report.failures.len()
        );

        self.sync_report = Some(report);
        self.conn = Some(Mutex::new(conn));
        Ok(())
    }

    /// Releases the connection. Later operations observe a closed store.
    pub fn close(&mut self) {
        let Some(conn) = self.conn.take() else {
            debug!("event=store_close module=store status=skipped reason=not_open");
            return;
        };

        let conn = conn
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err((_, err)) = conn.close() {
            error!("event=store_close module=store status=error error={err}");
            return;
        }
        info!(
            "event=store_close module=store status=ok mode={}",
            self.config.target.mode()
        );
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Schema sync results from the most recent successful `open`.
    pub fn last_sync_report(&self) -> Option<&SyncReport> {
        self.sync_report.as_ref()
    }

    /// Runs `f` against the raw connection, or returns `None` when closed.
    ///
    /// Store operations called from inside `f` on the same thread fail with
    /// [`StoreError::ConnectionInUse`] rather than waiting on the connection;
    /// a nested `with_connection` returns `None`.
    pub fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> R) -> Option<R> {
        let result = self.connection_slot().and_then(|slot| {
            let conn = lock_slot(slot)?;
            let _held = HeldConnection::enter(slot);
            Ok(f(&conn))
        });
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                log_failure("with_connection", "-", &err);
                None
            }
        }
    }

    fn connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        lock_slot(self.connection_slot()?)
    }

    fn connection_slot(&self) -> StoreResult<&Mutex<Connection>> {
        self.conn.as_ref().ok_or(StoreError::ConnectionUnavailable)
    }

    /// Checks that the store is open and `T` is registered.
    fn ensure_model<T: Entity>(&self) -> StoreResult<&ModelDescriptor> {
        if self.conn.is_none() {
            return Err(StoreError::ConnectionUnavailable);
        }
        self.registry
            .descriptor_for::<T>()
            .ok_or(StoreError::Unregistered(T::TYPE_NAME))
    }
}

thread_local! {
    /// Connections currently lent out by `with_connection` on this thread.
    static HELD_CONNECTIONS: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

fn slot_key(slot: &Mutex<Connection>) -> usize {
    slot as *const Mutex<Connection> as usize
}

fn lock_slot(slot: &Mutex<Connection>) -> StoreResult<MutexGuard<'_, Connection>> {
    let key = slot_key(slot);
    if HELD_CONNECTIONS.with(|held| held.borrow().contains(&key)) {
        return Err(StoreError::ConnectionInUse);
    }
    // Poisoning is ignored: each statement is atomic at the SQLite level.
    Ok(slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
}

/// Marks a connection as held on this thread until dropped, unwinding included.
struct HeldConnection(usize);

impl HeldConnection {
    fn enter(slot: &Mutex<Connection>) -> Self {
        let key = slot_key(slot);
        HELD_CONNECTIONS.with(|held| held.borrow_mut().push(key));
        Self(key)
    }
}

impl Drop for HeldConnection {
    fn drop(&mut self) {
        HELD_CONNECTIONS.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(index) = held.iter().rposition(|key| *key == self.0) {
                held.swap_remove(index);
            }
        });
    }
}

/// Logs the cause behind a soft-failure result.
fn log_failure(op: &'static str, type_name: &str, err: &StoreError) {
    match err {
        StoreError::NotFound { .. } | StoreError::InvalidIdentity { .. } => {
            debug!("event={op} module=store status=empty model={type_name} reason={err}");
        }
        StoreError::ConnectionUnavailable
        | StoreError::ConnectionInUse
        | StoreError::UnsavedEntity { .. } => {
            warn!("event={op} module=store status=error model={type_name} error={err}");
        }
        StoreError::Unregistered(_) | StoreError::Db(_) => {
            error!("event={op} module=store status=error model={type_name} error={err}");
        }
    }
}
