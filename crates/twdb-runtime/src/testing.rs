//! Explicit database provisioning for tests.
//!
//! Database configuration is EXPLICIT: pass a URL to `from_url()`, or opt in
//! with `from_env()`, which reads `TEST_DATABASE_URL`. Nothing else is read.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use twdb_core::error::{MigrateError, Result};

static NEXT_DB: AtomicU32 = AtomicU32::new(0);

/// Explicit database access for tests.
///
/// Tests using it are marked `#[ignore = "needs TEST_DATABASE_URL"]`.
///
/// ```ignore
/// let db = TestDatabase::from_env().await?;
/// let scratch = db.isolated("additive_run").await?;
/// ```
pub struct TestDatabase {
    pool: MySqlPool,
    url: String,
}

impl TestDatabase {
    /// Connect to the server at the given `mysql://` URL.
    pub async fn from_url(url: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .connect(url)
            .await
            .map_err(db_err)?;

        Ok(Self {
            pool,
            url: url.to_string(),
        })
    }

    /// Connect using the `TEST_DATABASE_URL` environment variable.
    pub async fn from_env() -> Result<Self> {
        let url = std::env::var("TEST_DATABASE_URL").map_err(|_| {
            MigrateError::DbOpen(
                "TEST_DATABASE_URL not set. Set it explicitly for database tests.".to_string(),
            )
        })?;
        Self::from_url(&url).await
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Create a dedicated, uniquely named database for a single test.
    pub async fn isolated(&self, test_name: &str) -> Result<IsolatedTestDb> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let db_name = format!(
            "twdb_test_{}_{}_{}_{}",
            sanitize_db_name(test_name),
            std::process::id(),
            stamp,
            NEXT_DB.fetch_add(1, Ordering::Relaxed)
        );

        sqlx::query(&format!("CREATE DATABASE `{}`", db_name))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        let url = replace_db_name(&self.url, &db_name);
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .map_err(db_err)?;

        Ok(IsolatedTestDb {
            pool,
            db_name,
            url,
            admin: self.pool.clone(),
        })
    }
}

/// A scratch database that lives for a single test.
pub struct IsolatedTestDb {
    pool: MySqlPool,
    db_name: String,
    url: String,
    admin: MySqlPool,
}

impl IsolatedTestDb {
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Connection URL pointing at this database.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run raw SQL to set up schema or data.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Drop the database.
    pub async fn cleanup(self) -> Result<()> {
        self.pool.close().await;
        sqlx::query(&format!("DROP DATABASE IF EXISTS `{}`", self.db_name))
            .execute(&self.admin)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> MigrateError {
    MigrateError::DbOpen(e.to_string())
}

/// Sanitize a test name for use in a database name.
fn sanitize_db_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(24)
        .collect()
}

/// Replace the database name in a connection URL.
fn replace_db_name(url: &str, new_db: &str) -> String {
    let (base, query) = match url.find('?') {
        Some(idx) => (&url[..idx], &url[idx..]),
        None => (url, ""),
    };
    let authority_start = base.find("://").map(|i| i + 3).unwrap_or(0);
    let prefix = match base[authority_start..].find('/') {
        Some(slash) => &base[..authority_start + slash],
        None => base,
    };
    format!("{}/{}{}", prefix, new_db, query)
}
