use serde::{Deserialize, Serialize};

use super::types::SqlType;

/// Definition of a model field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name in Rust (snake_case or camelCase).
    pub name: String,
    /// Column name in SQL.
    pub column_name: String,
    /// SQL type.
    pub sql_type: SqlType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Field attributes.
    pub attributes: Vec<FieldAttribute>,
    /// Default value expression (SQL).
    pub default: Option<String>,
    /// Column comment.
    pub comment: Option<String>,
}

impl FieldDef {
    /// Create a new NOT NULL field definition.
    pub fn new(name: &str, sql_type: SqlType) -> Self {
        Self {
            name: name.to_string(),
            column_name: to_snake_case(name),
            sql_type,
            nullable: false,
            attributes: Vec::new(),
            default: None,
            comment: None,
        }
    }

    /// Allow NULL in this column.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Set the SQL default expression, e.g. `0`, `''` or `CURRENT_TIMESTAMP(3)`.
    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Set the column comment.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Add an attribute.
    pub fn with(mut self, attribute: FieldAttribute) -> Self {
        if !self.attributes.contains(&attribute) {
            self.attributes.push(attribute);
        }
        self
    }

    /// Check if this field is part of the primary key.
    pub fn is_primary_key(&self) -> bool {
        self.attributes.contains(&FieldAttribute::PrimaryKey)
    }

    /// Check if this field auto-increments.
    pub fn is_auto_increment(&self) -> bool {
        self.attributes.contains(&FieldAttribute::AutoIncrement)
    }

    /// Check if this field is indexed.
    pub fn is_indexed(&self) -> bool {
        self.attributes.contains(&FieldAttribute::Indexed)
    }

    /// Check if this field is unique.
    pub fn is_unique(&self) -> bool {
        self.attributes.contains(&FieldAttribute::Unique)
    }

    /// Generate SQL column definition.
    ///
    /// Keys and indexes are declared at table level, so this covers the
    /// column alone and doubles as the body of `ADD COLUMN` and `MODIFY COLUMN`.
    pub fn to_sql_column(&self) -> String {
        let mut parts = vec![quote_ident(&self.column_name), self.sql_type.to_sql()];

        if self.nullable && !self.is_primary_key() {
            parts.push("NULL".to_string());
        } else {
            parts.push("NOT NULL".to_string());
        }

        if self.is_auto_increment() {
            parts.push("AUTO_INCREMENT".to_string());
        }

        if let Some(ref default) = self.default {
            parts.push(format!("DEFAULT {}", default));
        }

        if let Some(ref comment) = self.comment {
            parts.push(format!("COMMENT '{}'", comment.replace('\'', "''")));
        }

        parts.join(" ")
    }
}

/// Field attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldAttribute {
    /// Member of the primary key.
    PrimaryKey,
    /// Auto-incrementing integer.
    AutoIncrement,
    /// Create a secondary index on this field.
    Indexed,
    /// Create a unique index on this field.
    Unique,
}

/// Quote an identifier with backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Convert a string to snake_case.
pub(crate) fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
