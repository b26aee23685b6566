use std::time::Duration;

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::ConnectOptions;
use tracing::info;

use twdb_core::config::PoolPolicy;
use twdb_core::error::Result;

use super::dsn::MySqlDsn;

/// Statements slower than this are logged at warn.
const SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_secs(1);

/// Database connection wrapper providing connection pooling.
pub struct Database {
    pool: MySqlPool,
    policy: PoolPolicy,
}

impl Database {
    /// Open a pooled client from a connection string.
    ///
    /// The pool connects lazily: no round-trip happens here, so an
    /// unreachable server surfaces on the first statement instead. Statement
    /// logging is routed through `tracing`, into whatever sink is installed.
    pub fn open(dsn: &str, policy: &PoolPolicy) -> Result<Self> {
        let dsn = MySqlDsn::parse(dsn)?;
        let options = dsn
            .to_connect_options()?
            .log_statements(log::LevelFilter::Debug)
            .log_slow_statements(log::LevelFilter::Warn, SLOW_STATEMENT_THRESHOLD);

        // sqlx has no ceiling on idle connections; idle ones are only trimmed
        // by idle_timeout. max_idle stays in the policy for reporting.
        let pool = MySqlPoolOptions::new()
            .max_connections(policy.max_open)
            .min_connections(0)
            .max_lifetime(policy.max_lifetime)
            .connect_lazy_with(options);

        info!(
            dsn = %dsn,
            max_idle = policy.max_idle,
            max_open = policy.max_open,
            max_lifetime_secs = policy.max_lifetime.as_secs(),
            "database pool configured"
        );

        Ok(Self {
            pool,
            policy: policy.clone(),
        })
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Pool policy applied at open.
    pub fn policy(&self) -> &PoolPolicy {
        &self.policy
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
