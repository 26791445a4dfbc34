use acquiring::gateway::config::GatewayConfig;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub worker_server: WorkerServer,
    pub database: Database,
    pub gateway: GatewayConfig,
    pub status_polling: StatusPollingConfig,
}

#[derive(Debug, Clone)]
pub struct WorkerServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPollingConfig {
    /// Delay before a job whose order is not settled yet runs again.
    pub backoff_secs: u64,
    /// Measured from job creation. Past it the job is dead.
    pub time_limit_secs: u64,
    /// Sleep when no job is due.
    pub idle_secs: u64,
    /// A running job locked longer than this lost its worker and is claimed again.
    pub lease_secs: u64,
}

impl Default for StatusPollingConfig {
    fn default() -> Self {
        Self {
            backoff_secs: 60,
            time_limit_secs: 1200,
            idle_secs: 5,
            lease_secs: 300,
        }
    }
}

impl StatusPollingConfig {
    /// Lock time before which a running job counts as abandoned.
    pub fn stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::seconds(self.lease_secs as i64)
    }
}
