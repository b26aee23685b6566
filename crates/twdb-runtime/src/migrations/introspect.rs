//! Live schema introspection through `information_schema`.

use sqlx::MySqlPool;

use twdb_core::schema::quote_ident;

/// (name, type, is_nullable, default, extra, comment) from `COLUMNS`.
type ColumnRow = (String, String, String, Option<String>, String, String);

/// Representation of a database table (from introspection).
#[derive(Debug, Clone, Default)]
pub struct DatabaseTable {
    pub name: String,
    pub columns: Vec<DatabaseColumn>,
    pub indexes: Vec<DatabaseIndex>,
    /// Foreign key constraint names.
    pub foreign_keys: Vec<String>,
}

impl DatabaseTable {
    /// Find a column by name, ignoring case as MySQL does.
    pub fn column(&self, name: &str) -> Option<&DatabaseColumn> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.iter().any(|i| i.name.eq_ignore_ascii_case(name))
    }

    pub fn has_foreign_key(&self, name: &str) -> bool {
        self.foreign_keys
            .iter()
            .any(|fk| fk.eq_ignore_ascii_case(name))
    }
}

/// Representation of a database column (from introspection).
#[derive(Debug, Clone)]
pub struct DatabaseColumn {
    pub name: String,
    /// Full `COLUMN_TYPE`, e.g. `bigint unsigned` or `varchar(64)`.
    pub column_type: String,
    pub nullable: bool,
    /// `COLUMN_DEFAULT` as reported: unquoted on MySQL, quoted on MariaDB.
    pub default: Option<String>,
    /// `EXTRA`, e.g. `auto_increment` or `on update CURRENT_TIMESTAMP(3)`.
    pub extra: String,
    pub comment: Option<String>,
}

impl DatabaseColumn {
    /// Column definition with a new type and every live attribute kept.
    ///
    /// Used as the body of `MODIFY COLUMN`, which otherwise resets
    /// nullability, default, auto-increment and comment.
    pub fn definition_with_type(&self, sql_type: &str) -> String {
        let mut parts = vec![quote_ident(&self.name), sql_type.to_string()];

        parts.push(if self.nullable { "NULL" } else { "NOT NULL" }.to_string());

        if let Some(default) = self.default_sql() {
            parts.push(format!("DEFAULT {}", default));
        }

        let extra = self.extra.to_ascii_lowercase();
        if extra.contains("auto_increment") {
            parts.push("AUTO_INCREMENT".to_string());
        }
        if let Some(pos) = extra.find("on update ") {
            let expr = self.extra[pos + "on update ".len()..].trim();
            parts.push(format!("ON UPDATE {}", expr));
        }

        if let Some(ref comment) = self.comment {
            parts.push(format!("COMMENT '{}'", escape_literal(comment)));
        }

        parts.join(" ")
    }

    /// The default as SQL text, or `None` when there is none to restate.
    fn default_sql(&self) -> Option<String> {
        let default = self.default.as_deref()?;
        // MariaDB reports a literal NULL default as the word NULL.
        if self.nullable && default.eq_ignore_ascii_case("NULL") {
            return None;
        }
        let lowered = default.to_ascii_lowercase();
        if default.starts_with('\'')
            || lowered.starts_with("current_timestamp")
            || lowered.starts_with("now(")
        {
            Some(default.to_string())
        } else if self.extra.to_ascii_lowercase().contains("default_generated") {
            // MySQL 8 expression default, reported without its parentheses.
            Some(format!("({})", default))
        } else {
            Some(format!("'{}'", escape_literal(default)))
        }
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// Representation of a database index (from introspection).
#[derive(Debug, Clone)]
pub struct DatabaseIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Reads table shapes from the current database.
pub struct SchemaInspector<'a> {
    pool: &'a MySqlPool,
}

impl<'a> SchemaInspector<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Load a table, or `None` if it does not exist.
    ///
    /// Text columns of `information_schema` are cast to CHAR because MySQL 8
    /// reports several of them as binary strings.
    pub async fn table(&self, name: &str) -> sqlx::Result<Option<DatabaseTable>> {
        let exists: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            "#,
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;

        if exists == 0 {
            return Ok(None);
        }

        let columns: Vec<ColumnRow> = sqlx::query_as(
            r#"
            SELECT CAST(COLUMN_NAME AS CHAR), CAST(COLUMN_TYPE AS CHAR),
                   CAST(IS_NULLABLE AS CHAR), CAST(COLUMN_DEFAULT AS CHAR),
                   CAST(EXTRA AS CHAR), CAST(COLUMN_COMMENT AS CHAR)
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#,
        )
        .bind(name)
        .fetch_all(self.pool)
        .await?;

        let index_rows: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT CAST(INDEX_NAME AS CHAR), CAST(COLUMN_NAME AS CHAR),
                   CAST(NON_UNIQUE AS SIGNED)
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
            "#,
        )
        .bind(name)
        .fetch_all(self.pool)
        .await?;

        let foreign_keys: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT CAST(CONSTRAINT_NAME AS CHAR)
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
              AND REFERENCED_TABLE_NAME IS NOT NULL
            "#,
        )
        .bind(name)
        .fetch_all(self.pool)
        .await?;

        let columns = columns
            .into_iter()
            .map(
                |(name, column_type, is_nullable, default, extra, comment)| DatabaseColumn {
                    name,
                    column_type,
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                    default,
                    extra,
                    comment: (!comment.is_empty()).then_some(comment),
                },
            )
            .collect();

        Ok(Some(DatabaseTable {
            name: name.to_string(),
            columns,
            indexes: group_indexes(index_rows),
            foreign_keys,
        }))
    }
}

/// Fold (index, column, non_unique) rows, already ordered by index and
/// sequence, into one entry per index.
fn group_indexes(rows: Vec<(String, String, i64)>) -> Vec<DatabaseIndex> {
    let mut indexes: Vec<DatabaseIndex> = Vec::new();
    for (index_name, column, non_unique) in rows {
        match indexes.last_mut() {
            Some(last) if last.name == index_name => last.columns.push(column),
            _ => indexes.push(DatabaseIndex {
                name: index_name,
                columns: vec![column],
                unique: non_unique == 0,
            }),
        }
    }
    indexes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_indexes() {
        let rows = vec![
            ("PRIMARY".to_string(), "id".to_string(), 0),
            ("idx_a_b".to_string(), "a".to_string(), 1),
            ("idx_a_b".to_string(), "b".to_string(), 1),
            ("idx_c".to_string(), "c".to_string(), 0),
        ];
        let indexes = group_indexes(rows);
        assert_eq!(indexes.len(), 3);
        assert!(indexes[0].unique);
        assert_eq!(indexes[1].columns, vec!["a", "b"]);
        assert!(!indexes[1].unique);
        assert!(indexes[2].unique);
    }

    #[test]
    fn test_lookups_ignore_case() {
        let table = DatabaseTable {
            name: "players".to_string(),
            columns: vec![DatabaseColumn {
                name: "Player_Id".to_string(),
                column_type: "varchar(64)".to_string(),
                nullable: false,
                default: None,
                extra: String::new(),
                comment: None,
            }],
            indexes: vec![DatabaseIndex {
                name: "IDX_players_player_id".to_string(),
                columns: vec!["player_id".to_string()],
                unique: true,
            }],
            foreign_keys: vec!["fk_Players_Guild".to_string()],
        };
        assert!(table.column("player_id").is_some());
        assert!(table.has_index("idx_players_player_id"));
        assert!(table.has_foreign_key("fk_players_guild"));
        assert!(!table.has_index("idx_players_deleted_at"));
    }

    fn live(nullable: bool, default: Option<&str>, extra: &str) -> DatabaseColumn {
        DatabaseColumn {
            name: "title".to_string(),
            column_type: "varchar(32)".to_string(),
            nullable,
            default: default.map(str::to_string),
            extra: extra.to_string(),
            comment: None,
        }
    }

    #[test]
    fn test_definition_keeps_live_nullability() {
        assert_eq!(
            live(true, None, "").definition_with_type("varchar(64)"),
            "`title` varchar(64) NULL"
        );
        assert_eq!(
            live(true, Some("NULL"), "").definition_with_type("varchar(64)"),
            "`title` varchar(64) NULL"
        );
    }

    #[test]
    fn test_definition_quotes_live_default() {
        assert_eq!(
            live(false, Some(""), "").definition_with_type("varchar(64)"),
            "`title` varchar(64) NOT NULL DEFAULT ''"
        );
        assert_eq!(
            live(false, Some("it's"), "").definition_with_type("varchar(64)"),
            "`title` varchar(64) NOT NULL DEFAULT 'it''s'"
        );
        // Already quoted (MariaDB) or an expression: kept verbatim.
        assert_eq!(
            live(false, Some("'x'"), "").definition_with_type("varchar(64)"),
            "`title` varchar(64) NOT NULL DEFAULT 'x'"
        );
    }

    #[test]
    fn test_definition_keeps_extra_clauses() {
        let column = DatabaseColumn {
            name: "id".to_string(),
            column_type: "int unsigned".to_string(),
            nullable: false,
            default: None,
            extra: "auto_increment".to_string(),
            comment: Some("row id".to_string()),
        };
        assert_eq!(
            column.definition_with_type("bigint unsigned"),
            "`id` bigint unsigned NOT NULL AUTO_INCREMENT COMMENT 'row id'"
        );

        let stamp = DatabaseColumn {
            name: "updated_at".to_string(),
            column_type: "datetime(3)".to_string(),
            nullable: true,
            default: Some("CURRENT_TIMESTAMP(3)".to_string()),
            extra: "DEFAULT_GENERATED on update CURRENT_TIMESTAMP(3)".to_string(),
            comment: None,
        };
        assert_eq!(
            stamp.definition_with_type("datetime(3)"),
            "`updated_at` datetime(3) NULL DEFAULT CURRENT_TIMESTAMP(3) ON UPDATE CURRENT_TIMESTAMP(3)"
        );

        let token = DatabaseColumn {
            name: "token".to_string(),
            column_type: "varchar(36)".to_string(),
            nullable: false,
            default: Some("uuid()".to_string()),
            extra: "DEFAULT_GENERATED".to_string(),
            comment: None,
        };
        assert_eq!(
            token.definition_with_type("varchar(64)"),
            "`token` varchar(64) NOT NULL DEFAULT (uuid())"
        );
    }
}
