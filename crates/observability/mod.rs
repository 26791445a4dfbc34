mod config;
mod discord;
mod layer;
mod notifier;

use anyhow::Result;
use config::ObservabilityConfig;
use discord::DiscordSink;
use layer::AlertLayer;
use notifier::AlertDispatcher;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Installs the global subscriber: env-filtered local-time fmt output plus
/// optional Discord alerts. Must run inside a tokio runtime.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);
    let identity = &config.identity;

    let alert_layer = match &config.discord {
        Some(discord) => {
            let sink = DiscordSink::new(discord.webhook_url.clone())?;
            let dispatcher = AlertDispatcher::spawn(vec![Arc::new(sink)]);
            Some(
                AlertLayer::new(dispatcher, identity.clone())
                    .with_filter(LevelFilter::from_level(discord.threshold)),
            )
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            service = %identity.service,
            stage = %identity.stage,
            component = %identity.component,
            %warning,
            "observability: config warning"
        );
    }

    info!(
        service = %identity.service,
        stage = %identity.stage,
        component = %identity.component,
        alerts_enabled = config.discord.is_some(),
        "observability: initialized"
    );

    Ok(())
}
