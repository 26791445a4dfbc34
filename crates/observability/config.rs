use std::env;
use tracing::Level;
use url::Url;

#[derive(Clone, Debug)]
pub(crate) struct ServiceIdentity {
    pub(crate) service: String,
    pub(crate) stage: String,
    pub(crate) component: String,
}

#[derive(Clone, Debug)]
pub(crate) struct DiscordSinkConfig {
    pub(crate) webhook_url: Url,
    pub(crate) threshold: Level,
}

#[derive(Clone, Debug)]
pub(crate) struct ObservabilityConfig {
    pub(crate) identity: ServiceIdentity,
    pub(crate) discord: Option<DiscordSinkConfig>,
    /// Logged once the subscriber is installed.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(component: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let component = component.trim().to_string();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let identity = ServiceIdentity {
            service: non_empty("SERVICE_NAME").unwrap_or_else(|| component.clone()),
            stage: non_empty("STAGE").unwrap_or_else(|| "unknown".to_string()),
            component,
        };

        let mut warnings = Vec::new();
        let discord = discord_sink(&non_empty, &mut warnings);

        Self {
            identity,
            discord,
            warnings,
        }
    }
}

fn discord_sink<F>(lookup: &F, warnings: &mut Vec<String>) -> Option<DiscordSinkConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let enabled = match lookup("DISCORD_NOTIFY_ENABLED") {
        Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
            warnings.push(format!(
                "DISCORD_NOTIFY_ENABLED is not a boolean (value: {raw}); treating as enabled"
            ));
            true
        }),
        None => true,
    };
    if !enabled {
        return None;
    }

    let raw_url = lookup("DISCORD_WEBHOOK_URL")?;
    let webhook_url = match Url::parse(raw_url.trim()) {
        Ok(url) => url,
        Err(err) => {
            // The URL embeds the webhook secret; only the parse error is reported.
            warnings.push(format!(
                "DISCORD_WEBHOOK_URL is invalid; alerts disabled (parse error: {err})"
            ));
            return None;
        }
    };

    let threshold = match lookup("DISCORD_NOTIFY_LEVEL") {
        Some(raw) => parse_level(&raw).unwrap_or_else(|| {
            warnings.push(format!(
                "DISCORD_NOTIFY_LEVEL is invalid (value: {raw}); defaulting to ERROR"
            ));
            Level::ERROR
        }),
        None => Level::ERROR,
    };

    Some(DiscordSinkConfig {
        webhook_url,
        threshold,
    })
}

fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ObservabilityConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ObservabilityConfig::from_lookup("worker", |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_component_name_without_discord() {
        let config = config_from(&[]);
        assert_eq!(config.identity.service, "worker");
        assert_eq!(config.identity.stage, "unknown");
        assert!(config.discord.is_none());
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn invalid_webhook_is_a_warning_not_an_error() {
        let config = config_from(&[("DISCORD_WEBHOOK_URL", "not a url")]);
        assert!(config.discord.is_none());
        assert_eq!(config.warnings.len(), 1);
        assert!(!config.warnings[0].contains("not a url"));
    }

    #[test]
    fn reads_threshold() {
        let config = config_from(&[
            ("DISCORD_WEBHOOK_URL", "https://discord.example/api/webhooks/1/x"),
            ("DISCORD_NOTIFY_LEVEL", "warn"),
        ]);
        let discord = config.discord.unwrap();
        assert_eq!(discord.threshold, Level::WARN);
    }

    #[test]
    fn disabled_flag_wins() {
        let config = config_from(&[
            ("DISCORD_NOTIFY_ENABLED", "off"),
            ("DISCORD_WEBHOOK_URL", "https://discord.example/api/webhooks/1/x"),
        ]);
        assert!(config.discord.is_none());
    }
}
