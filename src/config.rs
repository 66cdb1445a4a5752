//! Configuration types.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Default on-disk location of the card database.
pub const DEFAULT_DB_PATH: &str = "./data/betastack.db";

/// Special path value that selects an in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Where the card database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// A local database file. Parent directories are created on open.
    File(PathBuf),
    /// A private in-memory database, gone when the store is dropped.
    Memory,
}

impl StoreLocation {
    /// Interpret a configured path, treating `:memory:` specially.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.as_os_str() == MEMORY_PATH {
            Self::Memory
        } else {
            Self::File(path.to_path_buf())
        }
    }
}

impl std::fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str(MEMORY_PATH),
        }
    }
}

/// Card store configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub location: StoreLocation,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: StoreLocation::File(PathBuf::from(DEFAULT_DB_PATH)),
            log_filter: "info".to_string(),
        }
    }
}

impl StoreConfig {
    /// Build config from environment variables.
    ///
    /// - `BETASTACK_DB_PATH`: database file, or `:memory:`
    /// - `BETASTACK_LOG`: fallback log filter
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok())?)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let defaults = Self::default();

        let location = match lookup("BETASTACK_DB_PATH") {
            Some(raw) if raw.trim().is_empty() => {
                return Err(ConfigError::InvalidValue {
                    key: "BETASTACK_DB_PATH".to_string(),
                    message: "path must not be empty".to_string(),
                });
            }
            Some(raw) => StoreLocation::from_path(raw.trim()),
            None => defaults.location,
        };

        let log_filter = lookup("BETASTACK_LOG")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.log_filter);

        Ok(Self {
            location,
            log_filter,
        })
    }
}
