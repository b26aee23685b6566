mod diff;
mod introspect;
mod migrator;

pub use diff::{DiffAction, DiffEntry, SchemaDiff};
pub use introspect::{DatabaseColumn, DatabaseIndex, DatabaseTable, SchemaInspector};
pub use migrator::{AutoMigrator, MigrationReport, TableOutcome};
