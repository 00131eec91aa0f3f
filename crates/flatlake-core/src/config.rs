//! Store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Backing strategy for tenant stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageMode {
    /// Transient per-tenant session, discarded on close or process exit.
    #[default]
    InMemory,

    /// One directory per tenant under `base_dir`, derived from a one-way
    /// hash of the tenant id; each table is a Parquet file. Restart
    /// reattaches from the tenant id alone.
    Persistent { base_dir: PathBuf },
}

/// Configuration for a [`crate::StoreManager`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub mode: StorageMode,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            mode: StorageMode::InMemory,
        }
    }

    pub fn persistent(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: StorageMode::Persistent {
                base_dir: base_dir.into(),
            },
        }
    }
}
