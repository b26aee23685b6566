//! Registry-driven auto-reconcile.
//!
//! Tables are visited in registration order. Each one is introspected,
//! diffed and brought up to date before the next is touched.

use sqlx::{ConnectOptions, Connection, MySqlPool};
use tracing::{debug, info};

use twdb_core::error::{MigrateError, Result};
use twdb_core::schema::{EntityRegistry, TableDef};

use super::diff::{DiffEntry, SchemaDiff};
use super::introspect::SchemaInspector;

/// Applies additive schema changes for every registered entity.
pub struct AutoMigrator {
    pool: MySqlPool,
}

impl AutoMigrator {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Reconcile every table, stopping at the first failure.
    pub async fn run(&self, registry: &EntityRegistry) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();

        // The pool only reports an acquire timeout; dial once to surface the cause.
        if let Some(first) = registry.tables().first() {
            let conn = self
                .pool
                .connect_options()
                .connect()
                .await
                .map_err(|e| migration_error(first, e))?;
            let _ = conn.close().await;
        }

        for table in registry.tables() {
            let applied = self.reconcile(table).await?;
            report.tables.push(TableOutcome {
                table: table.name.clone(),
                applied,
            });
        }

        Ok(report)
    }

    async fn reconcile(&self, table: &TableDef) -> Result<Vec<DiffEntry>> {
        let live = SchemaInspector::new(&self.pool)
            .table(&table.name)
            .await
            .map_err(|e| migration_error(table, e))?;

        let diff = SchemaDiff::for_table(table, live.as_ref())?;
        if diff.is_empty() {
            debug!(entity = %table.entity_name, table = %table.name, "schema up to date");
            return Ok(Vec::new());
        }

        for entry in &diff.entries {
            info!(table = %table.name, "{}", entry.details);
            sqlx::query(&entry.sql)
                .execute(&self.pool)
                .await
                .map_err(|e| migration_error(table, e))?;
        }

        Ok(diff.entries)
    }
}

fn migration_error(table: &TableDef, e: sqlx::Error) -> MigrateError {
    MigrateError::Migration {
        entity: table.entity_name.clone(),
        table: table.name.clone(),
        message: e.to_string(),
    }
}

/// What a run changed, per table.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub tables: Vec<TableOutcome>,
}

impl MigrationReport {
    /// Number of tables visited.
    pub fn tables_reconciled(&self) -> usize {
        self.tables.len()
    }

    /// Number of statements executed across all tables.
    pub fn statements_applied(&self) -> usize {
        self.tables.iter().map(|t| t.applied.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub table: String,
    pub applied: Vec<DiffEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::DiffAction;
    use crate::testing::TestDatabase;
    use twdb_core::models;
    use twdb_core::schema::{FieldDef, SqlType};

    #[test]
    fn test_report_counts() {
        let entry = |action| DiffEntry {
            action,
            table_name: "players".to_string(),
            details: String::new(),
            sql: String::new(),
        };
        let report = MigrationReport {
            tables: vec![
                TableOutcome {
                    table: "players".to_string(),
                    applied: vec![entry(DiffAction::AddColumn), entry(DiffAction::AddIndex)],
                },
                TableOutcome {
                    table: "guilds".to_string(),
                    applied: Vec::new(),
                },
            ],
        };
        assert_eq!(report.tables_reconciled(), 2);
        assert_eq!(report.statements_applied(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_on_first_table() {
        let db = crate::Database::open(
            "user:pw@tcp(127.0.0.1:1)/gamedb",
            &twdb_core::config::PoolPolicy::default(),
        )
        .unwrap();

        let mut registry = EntityRegistry::new();
        registry
            .register_table(
                TableDef::new("guilds", "Guild")
                    .field(FieldDef::new("id", SqlType::BigInt { unsigned: true })),
            )
            .register_table(
                TableDef::new("players", "Player")
                    .field(FieldDef::new("id", SqlType::BigInt { unsigned: true })),
            );

        let started = std::time::Instant::now();
        let err = AutoMigrator::new(db.pool().clone())
            .run(&registry)
            .await
            .unwrap_err();
        assert!(started.elapsed() < std::time::Duration::from_secs(10));

        assert_eq!(err.kind(), "MigrationError");
        let message = err.to_string();
        assert!(message.to_lowercase().contains("refused"), "{}", message);
        assert!(message.contains("guilds"));
        assert!(!message.contains("players"));
    }

    // The tests below need a MySQL server: cargo test -- --ignored

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL"]
    async fn test_first_run_creates_then_second_run_is_noop() {
        let server = TestDatabase::from_env().await.unwrap();
        let db = server.isolated("idempotent").await.unwrap();
        let migrator = AutoMigrator::new(db.pool().clone());
        let registry = models::registry();

        let first = migrator.run(&registry).await.unwrap();
        assert_eq!(first.tables[0].applied[0].action, DiffAction::CreateTable);

        let second = migrator.run(&registry).await.unwrap();
        assert_eq!(second.statements_applied(), 0);

        db.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL"]
    async fn test_extra_live_column_survives() {
        let server = TestDatabase::from_env().await.unwrap();
        let db = server.isolated("additive").await.unwrap();
        db.execute(
            "CREATE TABLE players (id bigint unsigned NOT NULL AUTO_INCREMENT PRIMARY KEY, \
             legacy_note varchar(16) NULL)",
        )
        .await
        .unwrap();

        let report = AutoMigrator::new(db.pool().clone())
            .run(&models::registry())
            .await
            .unwrap();
        assert!(report
            .tables[0]
            .applied
            .iter()
            .all(|e| e.action != DiffAction::CreateTable));

        let inspected = SchemaInspector::new(db.pool())
            .table("players")
            .await
            .unwrap()
            .unwrap();
        assert!(inspected.column("legacy_note").is_some());
        assert!(inspected.column("player_id").is_some());
        assert!(inspected.has_index("idx_players_player_id"));

        db.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL"]
    async fn test_narrow_live_column_is_widened() {
        let server = TestDatabase::from_env().await.unwrap();
        let db = server.isolated("widen").await.unwrap();
        db.execute(
            "CREATE TABLE players (id bigint unsigned NOT NULL AUTO_INCREMENT PRIMARY KEY, \
             nickname varchar(16) NULL COMMENT 'shown in chat')",
        )
        .await
        .unwrap();

        AutoMigrator::new(db.pool().clone())
            .run(&models::registry())
            .await
            .unwrap();

        let inspected = SchemaInspector::new(db.pool())
            .table("players")
            .await
            .unwrap()
            .unwrap();
        let nickname = inspected.column("nickname").unwrap();
        assert_eq!(
            SqlType::parse_column_type(&nickname.column_type),
            Some(SqlType::Varchar(64))
        );
        assert!(nickname.nullable);
        assert_eq!(nickname.comment.as_deref(), Some("shown in chat"));

        db.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL"]
    async fn test_incompatible_column_stops_the_run() {
        let server = TestDatabase::from_env().await.unwrap();
        let db = server.isolated("incompatible").await.unwrap();
        db.execute("CREATE TABLE things (id varchar(10) NOT NULL PRIMARY KEY)")
            .await
            .unwrap();

        let mut registry = EntityRegistry::new();
        registry.register_table(
            TableDef::new("things", "Thing").field(
                FieldDef::new("id", SqlType::BigInt { unsigned: true })
                    .with(twdb_core::schema::FieldAttribute::PrimaryKey),
            ),
        );

        let err = AutoMigrator::new(db.pool().clone())
            .run(&registry)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "MigrationError");

        db.cleanup().await.unwrap();
    }
}
