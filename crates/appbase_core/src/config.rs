//! Store configuration supplied by the host application's settings loader.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_DB_FILE_NAME: &str = "data.db";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreTarget {
    File(PathBuf),
    Memory,
}

impl StoreTarget {
    /// Short mode label used in log events.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }
}

impl Default for StoreTarget {
    fn default() -> Self {
        Self::File(PathBuf::from(DEFAULT_DB_FILE_NAME))
    }
}

/// Connection settings for [`Store`](crate::Store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub target: StoreTarget,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            target: StoreTarget::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: StoreTarget::File(path.into()),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            target: StoreTarget::Memory,
            ..Self::default()
        }
    }
}
