use acquiring::gateway::config::GatewayConfig;
use url::Url;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub storefront: Storefront,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Storefront {
    /// Public origin of this service; the gateway sends customers back here.
    pub public_base_url: Url,
}
