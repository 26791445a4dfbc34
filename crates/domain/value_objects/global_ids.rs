use anyhow::{Result, anyhow, bail};
use base64::{Engine, engine::general_purpose::STANDARD};
use uuid::Uuid;

pub const PAYMENT_TYPE: &str = "Payment";
pub const CHECKOUT_TYPE: &str = "Checkout";

/// Relay-style opaque id: `base64("<Type>:<id>")`.
pub fn encode(type_name: &str, id: &str) -> String {
    STANDARD.encode(format!("{type_name}:{id}"))
}

pub fn encode_payment(payment_id: Uuid) -> String {
    encode(PAYMENT_TYPE, &payment_id.to_string())
}

pub fn encode_checkout(checkout_token: Uuid) -> String {
    encode(CHECKOUT_TYPE, &checkout_token.to_string())
}

pub fn decode(global_id: &str) -> Result<(String, String)> {
    let bytes = STANDARD
        .decode(global_id.trim())
        .map_err(|err| anyhow!("global id is not base64: {err}"))?;
    let raw = String::from_utf8(bytes).map_err(|_| anyhow!("global id is not utf-8"))?;

    match raw.split_once(':') {
        Some((type_name, id)) if !type_name.is_empty() && !id.is_empty() => {
            Ok((type_name.to_string(), id.to_string()))
        }
        _ => bail!("global id has no type prefix"),
    }
}

pub fn decode_payment(global_id: &str) -> Result<Uuid> {
    let (type_name, id) = decode(global_id)?;
    if type_name != PAYMENT_TYPE {
        bail!("expected {PAYMENT_TYPE} id, got {type_name}");
    }
    Ok(Uuid::parse_str(&id)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_id_round_trips() {
        let id = Uuid::new_v4();
        let gid = encode_payment(id);
        assert_eq!(decode_payment(&gid).unwrap(), id);
    }

    #[test]
    fn rejects_foreign_type() {
        let gid = encode_checkout(Uuid::new_v4());
        assert!(decode_payment(&gid).is_err());
        assert!(decode_payment("not base64!").is_err());
    }
}
