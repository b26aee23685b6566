use std::time::Duration;

/// Connection pool policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPolicy {
    /// Connections kept warm while idle.
    pub max_idle: u32,

    /// Upper bound on open connections.
    pub max_open: u32,

    /// Connections are recycled after this long.
    pub max_lifetime: Duration,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            max_idle: 10,
            max_open: 100,
            max_lifetime: Duration::from_secs(4 * 60 * 60), // 4 hours
        }
    }
}
