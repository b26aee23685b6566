//! Runtime side of the schema bootstrap: connection pool, log sink and
//! the auto-migrator.

pub mod db;
pub mod logging;
pub mod migrations;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use db::Database;
pub use logging::LogSink;
pub use migrations::{AutoMigrator, MigrationReport, SchemaDiff};
