use serde_json::Value;

/// `errorCode` values the gateway documents as request failures.
pub const KNOWN_FAILURE_CODES: [&str; 8] = ["1", "2", "3", "4", "5", "6", "7", "8"];

/// Typed view over a `getOrderStatusExtended.do` response. The raw body is kept
/// verbatim for the payment's extra_data log and the transaction ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderStatus {
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub order_status: Option<i64>,
    pub action_code: Option<i64>,
    pub action_code_description: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub order_number: Option<String>,
    pub md_order: Option<String>,
    pub raw: Value,
}

impl OrderStatus {
    pub fn from_value(raw: Value) -> Self {
        let md_order = raw
            .get("attributes")
            .and_then(Value::as_array)
            .and_then(|attributes| {
                attributes.iter().find(|attribute| {
                    attribute.get("name").and_then(Value::as_str) == Some("mdOrder")
                })
            })
            .and_then(|attribute| string_field(attribute, "value"));

        Self {
            error_code: string_field(&raw, "errorCode"),
            error_message: string_field(&raw, "errorMessage"),
            order_status: int_field(&raw, "orderStatus"),
            action_code: int_field(&raw, "actionCode"),
            action_code_description: string_field(&raw, "actionCodeDescription"),
            amount: int_field(&raw, "amount"),
            currency: string_field(&raw, "currency"),
            order_number: string_field(&raw, "orderNumber"),
            md_order,
            raw,
        }
    }

    /// `errorCode` absent or zero. Any other value, known or not, is a failure.
    pub fn request_succeeded(&self) -> bool {
        match self.error_code.as_deref().map(str::trim) {
            None | Some("") | Some("0") => true,
            Some(_) => false,
        }
    }

    pub fn is_known_failure(&self) -> bool {
        self.error_code
            .as_deref()
            .is_some_and(|code| KNOWN_FAILURE_CODES.contains(&code.trim()))
    }

    /// `orderStatus` 3 (reversed), 4 (refunded) or 6 (declined): the order is
    /// closed and will never be paid.
    pub fn is_closed_unpaid(&self) -> bool {
        matches!(self.order_status, Some(3 | 4 | 6))
    }

    /// The bank approved the operation (`actionCode == 0`).
    pub fn is_approved(&self) -> bool {
        self.action_code == Some(0)
    }

    /// Lower-cased, trimmed `actionCodeDescription`, used for pending-status matching.
    pub fn normalized_description(&self) -> Option<String> {
        self.action_code_description
            .as_deref()
            .map(|description| description.trim().to_lowercase())
            .filter(|description| !description.is_empty())
    }

    /// Message suitable for a ledger `error` column.
    pub fn failure_message(&self) -> Option<String> {
        if self.request_succeeded() && self.action_code.is_none_or(|code| code == 0) {
            return None;
        }
        self.error_message
            .clone()
            .or_else(|| self.action_code_description.clone())
            .or_else(|| self.error_code.as_ref().map(|code| format!("error code {code}")))
            .or_else(|| self.action_code.map(|code| format!("action code {code}")))
    }
}

/// Reads a field that the gateway sends either as a JSON string or number.
pub fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn int_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
