pub const DEFAULT_CURRENCY: &str = "RUB";
pub const DEFAULT_LOCALE: &str = "ru";

/// ISO-4217 numeric code the gateway expects in `currency`.
pub fn numeric_code(alpha: &str) -> Option<u16> {
    let code = match alpha.trim().to_ascii_uppercase().as_str() {
        "RUB" => 643,
        "USD" => 840,
        "EUR" => 978,
        "GBP" => 826,
        "CNY" => 156,
        "KZT" => 398,
        "BYN" => 933,
        "UAH" => 980,
        "CHF" => 756,
        "JPY" => 392,
        _ => return None,
    };
    Some(code)
}

pub fn alpha_code(numeric: &str) -> Option<&'static str> {
    let alpha = match numeric.trim() {
        "643" | "810" => "RUB",
        "840" => "USD",
        "978" => "EUR",
        "826" => "GBP",
        "156" => "CNY",
        "398" => "KZT",
        "933" => "BYN",
        "980" => "UAH",
        "756" => "CHF",
        "392" => "JPY",
        _ => return None,
    };
    Some(alpha)
}

/// Parses a comma separated list of currency codes. Empty input yields the default.
pub fn parse_supported_currencies(raw: &str) -> Vec<String> {
    let parsed: Vec<String> = raw
        .split(',')
        .map(|code| code.trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty())
        .collect();

    if parsed.is_empty() {
        vec![DEFAULT_CURRENCY.to_string()]
    } else {
        parsed
    }
}

pub fn is_supported(currency: &str, supported: &[String]) -> bool {
    let currency = currency.trim().to_ascii_uppercase();
    supported.iter().any(|code| *code == currency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_rub_to_643() {
        assert_eq!(numeric_code("RUB"), Some(643));
        assert_eq!(numeric_code(" rub "), Some(643));
        assert_eq!(alpha_code("643"), Some("RUB"));
        assert_eq!(numeric_code("XXX"), None);
    }

    #[test]
    fn parses_supported_list() {
        assert_eq!(
            parse_supported_currencies(" rub, usd ,,EUR"),
            vec!["RUB".to_string(), "USD".to_string(), "EUR".to_string()]
        );
        assert_eq!(parse_supported_currencies("  "), vec!["RUB".to_string()]);
    }

    #[test]
    fn support_check_ignores_case() {
        let supported = parse_supported_currencies("RUB");
        assert!(is_supported("rub", &supported));
        assert!(!is_supported("USD", &supported));
    }
}
