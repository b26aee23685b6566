use twdb_core::error::{MigrateError, Result};
use twdb_core::schema::{quote_ident, FieldDef, SqlType, TableDef, TypeChange};

use super::introspect::{DatabaseColumn, DatabaseTable};

/// Additive changes that bring one live table up to its descriptor.
#[derive(Debug, Clone, Default)]
pub struct SchemaDiff {
    /// Changes to be applied, in execution order.
    pub entries: Vec<DiffEntry>,
}

impl SchemaDiff {
    /// Create an empty diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a table descriptor to the live table, if any.
    ///
    /// Only additions and widenings are emitted. Whatever exists live but is
    /// not declared is left untouched.
    pub fn for_table(table: &TableDef, live: Option<&DatabaseTable>) -> Result<Self> {
        let Some(db) = live else {
            return Ok(Self {
                entries: vec![DiffEntry {
                    action: DiffAction::CreateTable,
                    table_name: table.name.clone(),
                    details: format!("Create table {}", table.name),
                    sql: table.to_create_table_sql(),
                }],
            });
        };

        let mut entries = Vec::new();

        for field in &table.fields {
            match db.column(&field.column_name) {
                None => entries.push(DiffEntry {
                    action: DiffAction::AddColumn,
                    table_name: table.name.clone(),
                    details: format!("Add column {}", field.column_name),
                    sql: Self::add_column_sql(&table.name, field),
                }),
                Some(column) => {
                    if let Some(entry) = Self::compare_column(table, field, column)? {
                        entries.push(entry);
                    }
                }
            }
        }

        for index in table.all_indexes() {
            if !db.has_index(&index.name) {
                entries.push(DiffEntry {
                    action: DiffAction::AddIndex,
                    table_name: table.name.clone(),
                    details: format!("Add index {}", index.name),
                    sql: index.to_create_sql(&table.name),
                });
            }
        }

        for fk in &table.foreign_keys {
            if !db.has_foreign_key(&fk.name) {
                entries.push(DiffEntry {
                    action: DiffAction::AddForeignKey,
                    table_name: table.name.clone(),
                    details: format!("Add foreign key {}", fk.name),
                    sql: fk.to_add_sql(&table.name),
                });
            }
        }

        Ok(Self { entries })
    }

    fn compare_column(
        table: &TableDef,
        field: &FieldDef,
        column: &DatabaseColumn,
    ) -> Result<Option<DiffEntry>> {
        let declared = field.sql_type.to_sql();
        let Some(existing) = SqlType::parse_column_type(&column.column_type) else {
            tracing::warn!(
                table = %table.name,
                column = %field.column_name,
                live = %column.column_type,
                declared = %declared,
                "live column type not recognised; leaving it"
            );
            return Ok(None);
        };
        let change = SqlType::compare(&existing, &field.sql_type);

        match change {
            TypeChange::Same => Ok(None),
            TypeChange::Widen => Ok(Some(DiffEntry {
                action: DiffAction::WidenColumn,
                table_name: table.name.clone(),
                details: format!(
                    "Widen column {} from {} to {}",
                    field.column_name, column.column_type, declared
                ),
                // MODIFY replaces the whole definition, so restate the live attributes.
                sql: format!(
                    "ALTER TABLE {} MODIFY COLUMN {}",
                    quote_ident(&table.name),
                    column.definition_with_type(&declared)
                ),
            })),
            TypeChange::Narrower => {
                tracing::debug!(
                    table = %table.name,
                    column = %field.column_name,
                    live = %column.column_type,
                    declared = %declared,
                    "live column is wider than declared; leaving it"
                );
                Ok(None)
            }
            TypeChange::Incompatible => Err(MigrateError::Migration {
                entity: table.entity_name.clone(),
                table: table.name.clone(),
                message: format!(
                    "column {} has type {} which cannot be changed to {}",
                    field.column_name, column.column_type, declared
                ),
            }),
        }
    }

    fn add_column_sql(table_name: &str, field: &FieldDef) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_ident(table_name),
            field.to_sql_column()
        )
    }

    /// Check if there are any changes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get all SQL statements.
    pub fn to_sql(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.sql.clone()).collect()
    }
}

/// A single diff entry.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    /// Type of action.
    pub action: DiffAction,
    /// Affected table name.
    pub table_name: String,
    /// Human-readable description.
    pub details: String,
    /// SQL to apply.
    pub sql: String,
}

/// Type of schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffAction {
    CreateTable,
    AddColumn,
    WidenColumn,
    AddIndex,
    AddForeignKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::introspect::DatabaseIndex;
    use twdb_core::schema::{FieldAttribute, ForeignKeyDef};

    fn guilds_table() -> TableDef {
        TableDef::new("guild_members", "GuildMember")
            .field(
                FieldDef::new("id", SqlType::BigInt { unsigned: true })
                    .with(FieldAttribute::PrimaryKey)
                    .with(FieldAttribute::AutoIncrement),
            )
            .field(FieldDef::new("player_id", SqlType::BigInt { unsigned: true }).with(FieldAttribute::Indexed))
            .field(FieldDef::new("title", SqlType::Varchar(64)).default_value("''"))
            .foreign_key(ForeignKeyDef::new(
                "fk_guild_members_player",
                "player_id",
                "players",
                "id",
            ))
    }

    fn column(name: &str, column_type: &str) -> DatabaseColumn {
        DatabaseColumn {
            name: name.to_string(),
            column_type: column_type.to_string(),
            nullable: false,
            default: None,
            extra: String::new(),
            comment: None,
        }
    }

    /// The live shape produced by an earlier run of `guilds_table()`.
    fn reconciled() -> DatabaseTable {
        DatabaseTable {
            name: "guild_members".to_string(),
            columns: vec![
                column("id", "bigint(20) unsigned"),
                column("player_id", "bigint unsigned"),
                column("title", "varchar(64)"),
            ],
            indexes: vec![
                DatabaseIndex {
                    name: "PRIMARY".to_string(),
                    columns: vec!["id".to_string()],
                    unique: true,
                },
                DatabaseIndex {
                    name: "idx_guild_members_player_id".to_string(),
                    columns: vec!["player_id".to_string()],
                    unique: false,
                },
            ],
            foreign_keys: vec!["fk_guild_members_player".to_string()],
        }
    }

    #[test]
    fn test_absent_table_is_created() {
        let diff = SchemaDiff::for_table(&guilds_table(), None).unwrap();
        assert_eq!(diff.entries.len(), 1);
        assert_eq!(diff.entries[0].action, DiffAction::CreateTable);
        assert!(diff.to_sql()[0].starts_with("CREATE TABLE `guild_members`"));
    }

    #[test]
    fn test_reconciled_table_is_empty() {
        let diff = SchemaDiff::for_table(&guilds_table(), Some(&reconciled())).unwrap();
        assert!(diff.is_empty(), "unexpected: {:?}", diff.to_sql());
    }

    #[test]
    fn test_missing_column_is_added() {
        let mut live = reconciled();
        live.columns.retain(|c| c.name != "title");

        let diff = SchemaDiff::for_table(&guilds_table(), Some(&live)).unwrap();
        assert_eq!(diff.entries.len(), 1);
        assert_eq!(diff.entries[0].action, DiffAction::AddColumn);
        assert_eq!(
            diff.entries[0].sql,
            "ALTER TABLE `guild_members` ADD COLUMN `title` varchar(64) NOT NULL DEFAULT ''"
        );
    }

    #[test]
    fn test_undeclared_live_objects_are_ignored() {
        let mut live = reconciled();
        live.columns.push(column("legacy_flag", "int"));
        live.indexes.push(DatabaseIndex {
            name: "idx_legacy".to_string(),
            columns: vec!["legacy_flag".to_string()],
            unique: false,
        });
        live.foreign_keys.push("fk_legacy".to_string());

        let diff = SchemaDiff::for_table(&guilds_table(), Some(&live)).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_missing_index_and_foreign_key_are_added() {
        let mut live = reconciled();
        live.indexes.retain(|i| i.name == "PRIMARY");
        live.foreign_keys.clear();

        let diff = SchemaDiff::for_table(&guilds_table(), Some(&live)).unwrap();
        let actions: Vec<DiffAction> = diff.entries.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![DiffAction::AddIndex, DiffAction::AddForeignKey]);
        assert_eq!(
            diff.entries[0].sql,
            "CREATE INDEX `idx_guild_members_player_id` ON `guild_members` (`player_id`)"
        );
        assert!(diff.entries[1]
            .sql
            .starts_with("ALTER TABLE `guild_members` ADD CONSTRAINT `fk_guild_members_player`"));
    }

    #[test]
    fn test_wider_declared_type_is_modified() {
        let mut live = reconciled();
        live.columns[2] = DatabaseColumn {
            default: Some(String::new()),
            ..column("title", "varchar(32)")
        };

        let diff = SchemaDiff::for_table(&guilds_table(), Some(&live)).unwrap();
        assert_eq!(diff.entries.len(), 1);
        assert_eq!(diff.entries[0].action, DiffAction::WidenColumn);
        assert_eq!(
            diff.entries[0].sql,
            "ALTER TABLE `guild_members` MODIFY COLUMN `title` varchar(64) NOT NULL DEFAULT ''"
        );
    }

    #[test]
    fn test_widening_keeps_live_nullability() {
        let mut live = reconciled();
        live.columns[2] = DatabaseColumn {
            nullable: true,
            ..column("title", "varchar(32)")
        };

        let diff = SchemaDiff::for_table(&guilds_table(), Some(&live)).unwrap();
        assert_eq!(diff.entries.len(), 1);
        assert_eq!(
            diff.entries[0].sql,
            "ALTER TABLE `guild_members` MODIFY COLUMN `title` varchar(64) NULL"
        );
    }

    #[test]
    fn test_narrower_declared_type_is_left_alone() {
        let mut live = reconciled();
        live.columns[2] = column("title", "text");

        let diff = SchemaDiff::for_table(&guilds_table(), Some(&live)).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_incompatible_type_is_an_error() {
        let mut live = reconciled();
        live.columns[2] = column("title", "datetime");

        let err = SchemaDiff::for_table(&guilds_table(), Some(&live)).unwrap_err();
        assert_eq!(err.kind(), "MigrationError");
        let message = err.to_string();
        assert!(message.contains("GuildMember"));
        assert!(message.contains("title"));
    }

    #[test]
    fn test_unrecognised_live_type_is_left_alone() {
        let table = TableDef::new("events", "Event").field(
            FieldDef::new("id", SqlType::Int { unsigned: false }).with(FieldAttribute::PrimaryKey),
        );
        let live = DatabaseTable {
            name: "events".to_string(),
            columns: vec![column("ID", "INT(11)")],
            ..DatabaseTable::default()
        };
        assert!(SchemaDiff::for_table(&table, Some(&live)).unwrap().is_empty());

        let live = DatabaseTable {
            columns: vec![column("id", "enum('a','b')")],
            ..live
        };
        assert!(SchemaDiff::for_table(&table, Some(&live)).unwrap().is_empty());
    }

    #[test]
    fn test_fixed_width_live_column_matches_varchar() {
        let mut live = reconciled();
        live.columns[2] = column("title", "char(64)");

        let diff = SchemaDiff::for_table(&guilds_table(), Some(&live)).unwrap();
        assert!(diff.is_empty(), "unexpected: {:?}", diff.to_sql());
    }
}
