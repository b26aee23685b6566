//! Fixed-order run: load config, configure logs, open the database,
//! reconcile the schema. Any failure ends the run.

use std::fmt;

use tracing::{error, info};

use twdb_core::config::{PoolPolicy, ServerDefaults};
use twdb_core::error::MigrateError;
use twdb_core::{models, MigrateConfig};
use twdb_runtime::{AutoMigrator, Database, LogSink, MigrationReport};

use crate::cli::Args;

/// Step of the run a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoadConfig,
    ConfigureLogs,
    OpenDb,
    RunMigrations,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::LoadConfig => "load-config",
            Phase::ConfigureLogs => "configure-logs",
            Phase::OpenDb => "open-db",
            Phase::RunMigrations => "run-migrations",
        }
    }

    /// Whether the file sink is already installed when this phase runs.
    fn has_log_sink(&self) -> bool {
        matches!(self, Phase::OpenDb | Phase::RunMigrations)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal failure and the phase that produced it.
#[derive(Debug)]
pub struct Fatal {
    pub phase: Phase,
    pub error: MigrateError,
}

impl Fatal {
    fn at(phase: Phase) -> impl FnOnce(MigrateError) -> Fatal {
        move |error| Fatal { phase, error }
    }

    /// Emit the single fatal record.
    ///
    /// Before the file sink exists the record goes to stderr. Afterwards it
    /// goes to the log file, and a one-line summary is echoed to stderr.
    pub fn report(&self) {
        if self.phase.has_log_sink() {
            eprintln!("db_migrate: {}", self);
        } else {
            let _ = tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init();
        }

        error!(
            phase = %self.phase,
            kind = self.error.kind(),
            error = %self.error,
            "fatal"
        );
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.phase, self.error)
    }
}

impl std::error::Error for Fatal {}

/// Read the config file and prepare the log sink.
pub fn load(args: &Args) -> Result<(MigrateConfig, LogSink), Fatal> {
    let config = MigrateConfig::from_file(&args.config).map_err(Fatal::at(Phase::LoadConfig))?;

    let sink = config
        .logs()
        .and_then(|logs| LogSink::open(&logs))
        .map_err(Fatal::at(Phase::ConfigureLogs))?;

    Ok((config, sink))
}

/// Build the pool from the `MySQL` key.
pub fn open(config: &MigrateConfig) -> Result<Database, Fatal> {
    config
        .mysql_dsn()
        .and_then(|dsn| Database::open(dsn, &PoolPolicy::default()))
        .map_err(Fatal::at(Phase::OpenDb))
}

/// Reconcile every registered entity.
pub async fn migrate(db: &Database) -> Result<MigrationReport, Fatal> {
    let registry = models::registry();
    registry
        .validate()
        .map_err(Fatal::at(Phase::RunMigrations))?;

    AutoMigrator::new(db.pool().clone())
        .run(&registry)
        .await
        .map_err(Fatal::at(Phase::RunMigrations))
}

/// Run every phase in order.
pub async fn run(args: &Args) -> Result<(), Fatal> {
    let (config, sink) = load(args)?;
    sink.install().map_err(Fatal::at(Phase::ConfigureLogs))?;

    let db = open(&config)?;
    let result = migrate(&db).await;

    if let Ok(ref report) = result {
        announce(report);
    }

    db.close().await;
    result.map(|_| ())
}

/// Success records: the downstream server defaults, then the run summary.
fn announce(report: &MigrationReport) {
    info!(
        "migration run complete; downstream default config is: {}",
        ServerDefaults::default()
    );
    info!(
        tables = report.tables_reconciled(),
        statements = report.statements_applied(),
        "migration complete"
    );
}
