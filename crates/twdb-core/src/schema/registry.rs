use std::collections::HashSet;

use super::model::{ModelMeta, TableDef};
use crate::error::{MigrateError, Result};

/// Ordered list of entity descriptors to reconcile.
///
/// Order is kept exactly as registered and handed to the migrator verbatim,
/// so an entity referenced by a foreign key must be registered first.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    tables: Vec<TableDef>,
}

impl EntityRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    /// Register a model type.
    pub fn register<M: ModelMeta>(&mut self) -> &mut Self {
        self.tables.push(M::table_def());
        self
    }

    /// Register a table definition directly.
    pub fn register_table(&mut self, table: TableDef) -> &mut Self {
        self.tables.push(table);
        self
    }

    /// Get a table by name.
    pub fn get_table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// All registered tables, in registration order.
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Reject registries the migrator cannot act on.
    pub fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(MigrateError::Registry("no entities registered".to_string()));
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(MigrateError::Registry(format!(
                    "table {} registered more than once",
                    table.name
                )));
            }

            if table.fields.is_empty() {
                return Err(MigrateError::Registry(format!(
                    "entity {} declares no columns",
                    table.entity_name
                )));
            }

            if table.primary_key_columns().is_empty() {
                return Err(MigrateError::Registry(format!(
                    "entity {} declares no primary key",
                    table.entity_name
                )));
            }

            let mut columns = HashSet::new();
            for field in &table.fields {
                if !columns.insert(field.column_name.to_ascii_lowercase()) {
                    return Err(MigrateError::Registry(format!(
                        "entity {} declares column {} twice",
                        table.entity_name, field.column_name
                    )));
                }
            }

            let referenced = table
                .all_indexes()
                .into_iter()
                .flat_map(|i| i.columns)
                .chain(table.foreign_keys.iter().flat_map(|fk| fk.columns.clone()));
            for column in referenced {
                if table.column(&column).is_none() {
                    return Err(MigrateError::Registry(format!(
                        "entity {} references undeclared column {}",
                        table.entity_name, column
                    )));
                }
            }
        }

        Ok(())
    }
}
