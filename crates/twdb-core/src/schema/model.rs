use serde::{Deserialize, Serialize};

use super::field::{quote_ident, FieldDef};

/// Implemented by every entity whose table this tool manages.
pub trait ModelMeta {
    /// Table name in SQL.
    const TABLE_NAME: &'static str;

    /// Full table descriptor.
    fn table_def() -> TableDef;
}

/// Declarative description of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name in SQL.
    pub name: String,
    /// Entity (struct) name.
    pub entity_name: String,
    /// Columns in declaration order.
    pub fields: Vec<FieldDef>,
    /// Multi-column or explicitly named indexes.
    pub indexes: Vec<IndexDef>,
    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKeyDef>,
    /// Documentation comment.
    pub doc: Option<String>,
}

impl TableDef {
    /// Create a new, empty table definition.
    pub fn new(name: &str, entity_name: &str) -> Self {
        Self {
            name: name.to_string(),
            entity_name: entity_name.to_string(),
            fields: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            doc: None,
        }
    }

    /// Append a column.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Append an index.
    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    /// Append a foreign key.
    pub fn foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Find a column by its SQL name.
    pub fn column(&self, column_name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.column_name.eq_ignore_ascii_case(column_name))
    }

    /// Columns forming the primary key, in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_primary_key())
            .map(|f| f.column_name.as_str())
            .collect()
    }

    /// Every index the table should carry.
    ///
    /// Field-level `Indexed` and `Unique` attributes become single-column
    /// indexes named `idx_<table>_<column>`; explicit indexes follow.
    pub fn all_indexes(&self) -> Vec<IndexDef> {
        let mut indexes: Vec<IndexDef> = Vec::new();

        for field in &self.fields {
            if field.is_primary_key() || !(field.is_indexed() || field.is_unique()) {
                continue;
            }
            let name = format!("idx_{}_{}", self.name, field.column_name);
            indexes.push(IndexDef::new(&name, &[field.column_name.as_str()]).unique(field.is_unique()));
        }

        for index in &self.indexes {
            if !indexes.iter().any(|i| i.name == index.name) {
                indexes.push(index.clone());
            }
        }

        indexes
    }

    /// Generate CREATE TABLE SQL with columns, keys, indexes and foreign keys.
    pub fn to_create_table_sql(&self) -> String {
        let mut lines: Vec<String> = self.fields.iter().map(FieldDef::to_sql_column).collect();

        let pk = self.primary_key_columns();
        if !pk.is_empty() {
            lines.push(format!("PRIMARY KEY ({})", quote_list(&pk)));
        }

        for index in self.all_indexes() {
            lines.push(index.to_inline_sql());
        }

        for fk in &self.foreign_keys {
            lines.push(fk.to_constraint_sql());
        }

        format!(
            "CREATE TABLE {} (\n    {}\n)",
            quote_ident(&self.name),
            lines.join(",\n    ")
        )
    }
}

/// Index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name.
    pub name: String,
    /// Indexed columns, in key order.
    pub columns: Vec<String>,
    /// Unique constraint.
    pub unique: bool,
}

impl IndexDef {
    /// Create a non-unique index.
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    /// Mark the index unique.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    fn keyword(&self) -> &'static str {
        if self.unique {
            "UNIQUE INDEX"
        } else {
            "INDEX"
        }
    }

    fn to_inline_sql(&self) -> String {
        let columns: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        format!(
            "{} {} ({})",
            self.keyword(),
            quote_ident(&self.name),
            quote_list(&columns)
        )
    }

    /// Generate CREATE INDEX SQL for an existing table.
    pub fn to_create_sql(&self, table: &str) -> String {
        let columns: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        format!(
            "CREATE {} {} ON {} ({})",
            self.keyword(),
            quote_ident(&self.name),
            quote_ident(table),
            quote_list(&columns)
        )
    }
}

/// Foreign key constraint definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    /// Constraint name.
    pub name: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub ref_table: String,
    /// Referenced columns.
    pub ref_columns: Vec<String>,
    /// ON DELETE action, e.g. `CASCADE`.
    pub on_delete: Option<String>,
    /// ON UPDATE action.
    pub on_update: Option<String>,
}

impl ForeignKeyDef {
    /// Create a single-column foreign key.
    pub fn new(name: &str, column: &str, ref_table: &str, ref_column: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: vec![column.to_string()],
            ref_table: ref_table.to_string(),
            ref_columns: vec![ref_column.to_string()],
            on_delete: None,
            on_update: None,
        }
    }

    /// Set the ON DELETE action.
    pub fn on_delete(mut self, action: impl Into<String>) -> Self {
        self.on_delete = Some(action.into());
        self
    }

    /// Set the ON UPDATE action.
    pub fn on_update(mut self, action: impl Into<String>) -> Self {
        self.on_update = Some(action.into());
        self
    }

    /// Generate the CONSTRAINT clause.
    pub fn to_constraint_sql(&self) -> String {
        let columns: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let ref_columns: Vec<&str> = self.ref_columns.iter().map(String::as_str).collect();
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_ident(&self.name),
            quote_list(&columns),
            quote_ident(&self.ref_table),
            quote_list(&ref_columns)
        );
        if let Some(ref action) = self.on_delete {
            sql.push_str(&format!(" ON DELETE {}", action));
        }
        if let Some(ref action) = self.on_update {
            sql.push_str(&format!(" ON UPDATE {}", action));
        }
        sql
    }

    /// Generate ALTER TABLE SQL adding this constraint to an existing table.
    pub fn to_add_sql(&self, table: &str) -> String {
        format!(
            "ALTER TABLE {} ADD {}",
            quote_ident(table),
            self.to_constraint_sql()
        )
    }
}

fn quote_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}
