use thiserror::Error;

/// Error taxonomy for a migration run.
///
/// Every variant is terminal: the orchestrator logs it once with the phase
/// that produced it and exits non-zero.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("ConfigError: {0}")]
    Config(String),

    #[error("LogSetupError: {0}")]
    LogSetup(String),

    #[error("DBOpenError: {0}")]
    DbOpen(String),

    #[error("MigrationError: entity {entity} (table {table}): {message}")]
    Migration {
        entity: String,
        table: String,
        message: String,
    },

    #[error("RegistryError: {0}")]
    Registry(String),
}

impl MigrateError {
    /// Taxonomy name, as written in fatal log records.
    pub fn kind(&self) -> &'static str {
        match self {
            MigrateError::Config(_) => "ConfigError",
            MigrateError::LogSetup(_) => "LogSetupError",
            MigrateError::DbOpen(_) => "DBOpenError",
            MigrateError::Migration { .. } => "MigrationError",
            MigrateError::Registry(_) => "RegistryError",
        }
    }
}

/// Result type alias using MigrateError.
pub type Result<T> = std::result::Result<T, MigrateError>;
