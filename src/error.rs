//! Error types for BetaStack.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
///
/// Decoding of the extra-media column never shows up here; see
/// [`crate::cards::media::decode_extra_media`].
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// The storage engine could not be opened.
    #[error("Failed to open card store: {0}")]
    Open(String),

    /// The schema could not be ensured.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// An operation was issued before `init()` succeeded.
    #[error("Card store is not initialized; call init() first")]
    Uninitialized,

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DatabaseError {
    /// Whether this error came out of initialization (open or migrate).
    pub fn is_init_failure(&self) -> bool {
        matches!(self, Self::Open(_) | Self::Migration(_))
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
