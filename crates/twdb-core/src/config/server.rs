use std::fmt;

/// Default configuration of the game server that consumes this schema.
///
/// Nothing here is read from the config file. The values are printed after a
/// successful run so the operator can check what the servers will start with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDefaults {
    /// Server type this schema belongs to.
    pub server_type: String,

    /// Client heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,

    /// Messages buffered per client agent.
    pub agent_message_buffer: usize,

    /// Buffer for locally handled messages.
    pub local_process_buffer: usize,

    /// Buffer for messages forwarded to remote servers.
    pub remote_process_buffer: usize,

    /// Concurrent handler dispatchers.
    pub handler_dispatch: usize,

    /// Reject a second session bound to the same uid.
    pub unique_session: bool,

    /// Metrics reporting period in seconds.
    pub metrics_period_secs: u64,
}

impl Default for ServerDefaults {
    fn default() -> Self {
        Self {
            server_type: "db".to_string(),
            heartbeat_interval_secs: 30,
            agent_message_buffer: 100,
            local_process_buffer: 20,
            remote_process_buffer: 20,
            handler_dispatch: 25,
            unique_session: true,
            metrics_period_secs: 15,
        }
    }
}

impl fmt::Display for ServerDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={} heartbeat={}s agent_buffer={} local_buffer={} remote_buffer={} \
             dispatch={} unique_session={} metrics_period={}s",
            self.server_type,
            self.heartbeat_interval_secs,
            self.agent_message_buffer,
            self.local_process_buffer,
            self.remote_process_buffer,
            self.handler_dispatch,
            self.unique_session,
            self.metrics_period_secs,
        )
    }
}
