use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::schema::{FieldAttribute, FieldDef, ModelMeta, SqlType, TableDef};

/// A player account.
///
/// Rows are soft-deleted through `deleted_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub deleted_at: Option<NaiveDateTime>,
    /// Account identifier issued by the login server.
    pub player_id: String,
    pub nickname: String,
    pub avatar: String,
    pub gender: i8,
    pub gold: i64,
    pub diamond: i64,
    pub last_login_at: Option<NaiveDateTime>,
}

impl ModelMeta for Player {
    const TABLE_NAME: &'static str = "players";

    fn table_def() -> TableDef {
        let mut table = TableDef::new(Self::TABLE_NAME, "Player")
            .field(
                FieldDef::new("id", SqlType::BigInt { unsigned: true })
                    .with(FieldAttribute::PrimaryKey)
                    .with(FieldAttribute::AutoIncrement),
            )
            .field(FieldDef::new("created_at", SqlType::DateTime(3)).nullable())
            .field(FieldDef::new("updated_at", SqlType::DateTime(3)).nullable())
            .field(
                FieldDef::new("deleted_at", SqlType::DateTime(3))
                    .nullable()
                    .with(FieldAttribute::Indexed),
            )
            .field(
                FieldDef::new("player_id", SqlType::Varchar(64))
                    .with(FieldAttribute::Unique)
                    .comment("login account id"),
            )
            .field(FieldDef::new("nickname", SqlType::Varchar(64)).default_value("''"))
            .field(FieldDef::new("avatar", SqlType::Varchar(255)).default_value("''"))
            .field(FieldDef::new("gender", SqlType::TinyInt { unsigned: false }).default_value("0"))
            .field(FieldDef::new("gold", SqlType::BigInt { unsigned: false }).default_value("0"))
            .field(FieldDef::new("diamond", SqlType::BigInt { unsigned: false }).default_value("0"))
            .field(FieldDef::new("last_login_at", SqlType::DateTime(3)).nullable());
        table.doc = Some("A player account.".to_string());
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_table_shape() {
        let table = Player::table_def();
        assert_eq!(table.name, "players");
        assert_eq!(table.entity_name, "Player");
        assert_eq!(table.primary_key_columns(), vec!["id"]);
        assert_eq!(table.fields.len(), 11);

        let indexes = table.all_indexes();
        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].name, "idx_players_deleted_at");
        assert!(!indexes[0].unique);
        assert_eq!(indexes[1].name, "idx_players_player_id");
        assert!(indexes[1].unique);
    }

    #[test]
    fn test_player_create_sql() {
        let sql = Player::table_def().to_create_table_sql();
        assert!(sql.contains("`player_id` varchar(64) NOT NULL COMMENT 'login account id'"));
        assert!(sql.contains("`gold` bigint NOT NULL DEFAULT 0"));
        assert!(sql.contains("UNIQUE INDEX `idx_players_player_id` (`player_id`)"));
    }
}
