use std::collections::BTreeMap;

use anyhow::{Result, bail};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const CHECKSUM_FIELD: &str = "checksum";

/// Canonical string the bank signs: every field except `checksum`, sorted by name,
/// rendered as `name;value;`.
pub fn signing_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(key, _)| key.as_str() != CHECKSUM_FIELD)
        .map(|(key, value)| format!("{key};{value};"))
        .collect()
}

pub fn compute_checksum(secret: &str, params: &BTreeMap<String, String>) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(signing_string(params).as_bytes());
    Ok(hex::encode_upper(mac.finalize().into_bytes()))
}

/// Verifies the `checksum` field of a callback notification in constant time.
pub fn verify_checksum(secret: &str, params: &BTreeMap<String, String>) -> Result<()> {
    let Some(provided) = params.get(CHECKSUM_FIELD) else {
        bail!("callback checksum is missing");
    };
    let provided = hex::decode(provided.trim())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(signing_string(params).as_bytes());
    if mac.verify_slice(&provided).is_err() {
        bail!("callback checksum mismatch");
    }
    Ok(())
}
