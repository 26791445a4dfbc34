use acquiring::gateway::config::GatewayConfig;
use anyhow::{Context, Result};
use url::Url;

use super::config_model::{BackendServer, Database, DotEnvyConfig, Storefront};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: std::env::var("SERVER_PORT_BACKEND")
            .context("SERVER_PORT_BACKEND is invalid")?
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

    let storefront = Storefront {
        public_base_url: Url::parse(
            &std::env::var("PUBLIC_BASE_URL").context("PUBLIC_BASE_URL is invalid")?,
        )
        .context("PUBLIC_BASE_URL is not a valid URL")?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        storefront,
        gateway: GatewayConfig::from_env()?,
    })
}
