pub mod config;
pub mod error;
pub mod models;
pub mod schema;

pub use config::MigrateConfig;
pub use error::{MigrateError, Result};
pub use schema::{EntityRegistry, FieldDef, ModelMeta, TableDef};
