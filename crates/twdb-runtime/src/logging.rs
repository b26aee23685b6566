//! Rotating file sink for diagnostic output.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

use twdb_core::config::LogsConfig;
use twdb_core::error::{MigrateError, Result};

/// A configured, not yet installed, log sink.
pub struct LogSink {
    config: LogsConfig,
    writer: FileRotate<AppendCount>,
    pruned: Vec<PathBuf>,
}

impl LogSink {
    /// Prepare the log file and its rotation.
    ///
    /// Creates the parent directory, checks the file can be opened for
    /// append, and drops rotated backups older than the policy's max age.
    pub fn open(config: &LogsConfig) -> Result<Self> {
        let path = config.file.as_path();
        if path.as_os_str().is_empty() {
            return Err(MigrateError::LogSetup("log file path is empty".to_string()));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                MigrateError::LogSetup(format!(
                    "Failed to create log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                MigrateError::LogSetup(format!(
                    "Failed to open log file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let pruned = prune_expired_backups(path, config.rotation.max_age)?;

        let compression = if config.rotation.compress {
            Compression::OnRotate(0)
        } else {
            Compression::None
        };

        let writer = FileRotate::new(
            path,
            AppendCount::new(config.rotation.max_backups),
            ContentLimit::Bytes(config.rotation.max_size_bytes),
            compression,
            #[cfg(unix)]
            None,
        );

        Ok(Self {
            config: config.clone(),
            writer,
            pruned,
        })
    }

    /// Path of the active log file.
    pub fn path(&self) -> &Path {
        &self.config.file
    }

    /// Backups removed for exceeding the max age.
    pub fn pruned(&self) -> &[PathBuf] {
        &self.pruned
    }

    /// Build the subscriber without installing it.
    ///
    /// The filter comes from the configured level only; `RUST_LOG` is not
    /// consulted.
    pub fn into_subscriber(self) -> impl Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_writer(Mutex::new(self.writer))
            .with_ansi(false)
            .with_target(true)
            .with_env_filter(EnvFilter::new(self.config.level.directive()))
            .finish()
    }

    /// Install as the process-wide subscriber.
    pub fn install(self) -> Result<()> {
        let path = self.config.file.clone();
        let level = self.config.level;
        let pruned = self.pruned.len();

        tracing::subscriber::set_global_default(self.into_subscriber()).map_err(|e| {
            MigrateError::LogSetup(format!("Failed to install log sink: {}", e))
        })?;

        tracing::debug!(
            file = %path.display(),
            level = %level,
            pruned,
            "log sink installed"
        );
        Ok(())
    }
}

/// Remove rotated backups (`<file>.N` or `<file>.N.gz`) older than `max_age`.
fn prune_expired_backups(path: &Path, max_age: Duration) -> Result<Vec<PathBuf>> {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let entries = fs::read_dir(dir).map_err(|e| {
        MigrateError::LogSetup(format!(
            "Failed to scan log directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let now = SystemTime::now();
    let mut removed = Vec::new();

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_backup_of(file_name, name) {
            continue;
        }

        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > max_age);

        if expired && fs::remove_file(entry.path()).is_ok() {
            removed.push(entry.path());
        }
    }

    Ok(removed)
}

fn is_backup_of(file_name: &str, candidate: &str) -> bool {
    let Some(suffix) = candidate
        .strip_prefix(file_name)
        .and_then(|rest| rest.strip_prefix('.'))
    else {
        return false;
    };
    let index = suffix.strip_suffix(".gz").unwrap_or(suffix);
    !index.is_empty() && index.chars().all(|c| c.is_ascii_digit())
}
