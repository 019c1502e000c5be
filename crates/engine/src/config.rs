//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! database_path = "/var/lib/flowsync/flows.db"
//! log_filter = "flowsync=debug"
//!
//! [discovery]
//! is04_version = "v1.3"
//! is05_version = "v1.1"
//! timeout_secs = 5
//! ```
//!
//! Every key is optional.

use std::path::Path;

use flowsync_storage::SqliteStorage;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database_path: String,
    pub log_filter: String,
    pub discovery: DiscoveryDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: "flowsync.db".to_string(),
            log_filter: "flowsync=info".to_string(),
            discovery: DiscoveryDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiscoveryDefaults {
    pub is04_version: String,
    pub is05_version: String,
    pub timeout_secs: u64,
}

impl Default for DiscoveryDefaults {
    fn default() -> Self {
        Self {
            is04_version: "v1.3".to_string(),
            is05_version: "v1.1".to_string(),
            timeout_secs: 5,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn open_storage(&self) -> Result<SqliteStorage, EngineError> {
        Ok(SqliteStorage::open(&self.database_path)?)
    }

    /// Install the global fmt subscriber filtered by `log_filter`.
    /// `RUST_LOG` takes precedence. Fails if a subscriber is already set.
    pub fn init_tracing(&self) -> Result<(), EngineError> {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.log_filter)),
            )
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| EngineError::Config(e.to_string()))
    }
}
