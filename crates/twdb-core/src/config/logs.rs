use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::MigrateError;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsConfig {
    /// Records below this severity are discarded.
    pub level: LogLevel,

    /// Path to the active log file.
    pub file: PathBuf,

    /// When and how the active file is rolled over.
    pub rotation: RotationPolicy,
}

/// Severity names accepted in `Logs.LogLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        }
    }

    /// Filter directive for the tracing subscriber.
    ///
    /// tracing stops at `error`, so `fatal` keeps error records only.
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Fatal => "error",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" | "panic" => Ok(LogLevel::Fatal),
            _ => Err(MigrateError::LogSetup(format!(
                "not a valid log level: {:?}",
                s
            ))),
        }
    }
}

/// Size-based rotation policy for the log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Roll the active file over once it would exceed this many bytes.
    pub max_size_bytes: usize,

    /// Rotated backups to keep.
    pub max_backups: usize,

    /// Backups older than this are discarded.
    pub max_age: Duration,

    /// Gzip rotated backups.
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: 10 * 1024 * 1024, // 10 MiB
            max_backups: 3,
            max_age: Duration::from_secs(28 * 24 * 60 * 60),
            compress: true,
        }
    }
}
