use super::config_model::{Database, DotEnvyConfig, StatusPollingConfig, WorkerServer};
use acquiring::gateway::config::GatewayConfig;
use anyhow::{Context, Result};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: std::env::var("SERVER_PORT_WORKER")
            .context("SERVER_PORT_WORKER is invalid")?
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .context("SERVER_BODY_LIMIT is invalid")?
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .context("SERVER_TIMEOUT is invalid")?
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").context("DATABASE_URL is invalid")?,
        max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS is invalid")?,
    };

    let defaults = StatusPollingConfig::default();
    let status_polling = StatusPollingConfig {
        backoff_secs: env_or("STATUS_POLL_BACKOFF_SECS", defaults.backoff_secs)?,
        time_limit_secs: env_or("STATUS_POLL_TIME_LIMIT_SECS", defaults.time_limit_secs)?,
        idle_secs: env_or("STATUS_POLL_IDLE_SECS", defaults.idle_secs)?,
        lease_secs: env_or("STATUS_POLL_LEASE_SECS", defaults.lease_secs)?,
    };

    Ok(DotEnvyConfig {
        worker_server,
        database,
        gateway: GatewayConfig::from_env()?,
        status_polling,
    })
}

fn env_or(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is invalid")),
        _ => Ok(default),
    }
}
