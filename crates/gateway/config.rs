use std::{env, time::Duration};

use anyhow::{Context, Result};

use crate::domain::value_objects::{
    currencies::{self, DEFAULT_LOCALE},
    enums::transaction_kinds::TransactionKind,
};

pub const SBERBANK_GATEWAY: &str = "sberbank";
pub const SANDBOX_BASE_URL: &str = "https://3dsec.sberbank.ru/payment/rest/";
pub const PRODUCTION_BASE_URL: &str = "https://securepayments.sberbank.ru/payment/rest/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection and behaviour settings for the acquiring gateway. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub gateway_name: String,
    pub login: String,
    pub password: String,
    pub sandbox_mode: bool,
    pub auto_capture: bool,
    pub supported_currencies: Vec<String>,
    /// Lower-cased `actionCodeDescription` values that mean "still pending".
    pub pending_statuses: Vec<String>,
    pub callback_secret: Option<String>,
    pub base_url_override: Option<String>,
    pub timeout: Duration,
    pub locale: String,
}

impl GatewayConfig {
    /// Reads `SBERBANK_*` variables. Callers load `.env` first.
    pub fn from_env() -> Result<Self> {
        let optional = |key: &str| env::var(key).ok().filter(|value| !value.trim().is_empty());

        let timeout_secs = match optional("SBERBANK_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .context("SBERBANK_TIMEOUT_SECS is invalid")?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            gateway_name: SBERBANK_GATEWAY.to_string(),
            login: env::var("SBERBANK_LOGIN").context("SBERBANK_LOGIN is invalid")?,
            password: env::var("SBERBANK_PASSWORD").context("SBERBANK_PASSWORD is invalid")?,
            sandbox_mode: optional("SBERBANK_SANDBOX_MODE")
                .map(|raw| parse_flag(&raw))
                .unwrap_or(true),
            auto_capture: optional("SBERBANK_AUTO_CAPTURE")
                .map(|raw| parse_flag(&raw))
                .unwrap_or(true),
            supported_currencies: currencies::parse_supported_currencies(
                &optional("SBERBANK_SUPPORTED_CURRENCIES").unwrap_or_default(),
            ),
            pending_statuses: parse_pending_statuses(
                &optional("SBERBANK_PENDING_STATUSES").unwrap_or_default(),
            ),
            callback_secret: optional("SBERBANK_CALLBACK_SECRET"),
            base_url_override: optional("SBERBANK_BASE_URL"),
            timeout: Duration::from_secs(timeout_secs),
            locale: DEFAULT_LOCALE.to_string(),
        })
    }

    pub fn base_url(&self) -> String {
        let base = match &self.base_url_override {
            Some(url) => url.clone(),
            None if self.sandbox_mode => SANDBOX_BASE_URL.to_string(),
            None => PRODUCTION_BASE_URL.to_string(),
        };
        if base.ends_with('/') {
            base
        } else {
            format!("{base}/")
        }
    }

    pub fn supports_currency(&self, currency: &str) -> bool {
        currencies::is_supported(currency, &self.supported_currencies)
    }

    pub fn is_pending_description(&self, normalized_description: &str) -> bool {
        self.pending_statuses
            .iter()
            .any(|status| status == normalized_description)
    }

    pub fn default_kind(&self) -> TransactionKind {
        TransactionKind::for_auto_capture(self.auto_capture)
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn parse_pending_statuses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|status| status.trim().to_lowercase())
        .filter(|status| !status.is_empty())
        .collect()
}

#[cfg(test)]
pub(crate) fn test_config() -> GatewayConfig {
    GatewayConfig {
        gateway_name: SBERBANK_GATEWAY.to_string(),
        login: "merchant-api".to_string(),
        password: "secret".to_string(),
        sandbox_mode: true,
        auto_capture: true,
        supported_currencies: vec!["RUB".to_string()],
        pending_statuses: vec!["ожидание оплаты".to_string()],
        callback_secret: None,
        base_url_override: None,
        timeout: Duration::from_secs(5),
        locale: DEFAULT_LOCALE.to_string(),
    }
}
