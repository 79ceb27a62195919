//! Connection bootstrap for file and in-memory databases.

use super::DbResult;
use crate::config::{StoreConfig, StoreTarget};
use log::{error, info};
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Opens the configured SQLite database and applies connection pragmas.
///
/// Schema sync is not part of this step; see [`sync_schema`](super::sync_schema).
///
/// # Side effects
/// - Creates the database file when it does not exist.
/// - Emits `db_open` logging events with duration and status.
pub fn open_connection(config: &StoreConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = config.target.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match &config.target {
        StoreTarget::File(path) => Connection::open(path),
        StoreTarget::Memory => Connection::open_in_memory(),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match configure_connection(&conn, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_configure_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure_connection(conn: &Connection, config: &StoreConfig) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}
