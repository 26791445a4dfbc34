use super::notifier::{AlertEvent, AlertSink};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use url::Url;

const DISCORD_CONTENT_LIMIT: usize = 2000;
const TRUNCATION_SUFFIX: &str = "\n… (truncated)";

pub(crate) struct DiscordSink {
    webhook_url: Url,
    client: Client,
}

impl DiscordSink {
    pub(crate) fn new(webhook_url: Url) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(3)).build()?;
        Ok(Self {
            webhook_url,
            client,
        })
    }
}

pub(crate) fn render(event: &AlertEvent) -> String {
    let mut lines = vec![format!(
        "**{}** `{}` `{}` `{}`",
        event.service,
        event.stage,
        event.component,
        event.level.as_str()
    )];

    let mut origin = format!(
        "`{}` `{}`",
        event.at.to_rfc3339_opts(SecondsFormat::Secs, true),
        event.target
    );
    if let Some(location) = &event.location {
        origin.push_str(&format!(" `{location}`"));
    }
    lines.push(origin);

    if let Some(reference) = event.payment_ref() {
        lines.push(format!("ref: `{reference}`"));
    }

    if let Some(message) = event.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        lines.push(format!("> {message}"));
    }

    if !event.fields.is_empty() {
        lines.push("fields:".to_string());
        lines.extend(event.fields.iter().map(|(k, v)| format!("- `{k}` = `{v}`")));
    }

    for span in event.spans.iter().filter(|span| !span.fields.is_empty()) {
        lines.push(format!("span `{}`:", span.name));
        lines.extend(span.fields.iter().map(|(k, v)| format!("- `{k}` = `{v}`")));
    }

    truncate(lines.join("\n"))
}

fn truncate(content: String) -> String {
    if content.chars().count() <= DISCORD_CONTENT_LIMIT {
        return content;
    }
    let keep = DISCORD_CONTENT_LIMIT - TRUNCATION_SUFFIX.chars().count();
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}

#[async_trait]
impl AlertSink for DiscordSink {
    async fn deliver(&self, event: &AlertEvent) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": render(event) }))
            .send()
            .await
            // reqwest errors carry the URL, which embeds the webhook secret.
            .map_err(|err| {
                if err.is_timeout() {
                    anyhow!("discord webhook request timed out")
                } else if err.is_connect() {
                    anyhow!("discord webhook connection failed")
                } else {
                    anyhow!("discord webhook request failed")
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!(
                "discord webhook returned status {}",
                response.status()
            ))
        }
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}
