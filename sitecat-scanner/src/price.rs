// Price token normalization and the visible-text price scan

use regex::Regex;
use std::sync::LazyLock;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d(?:[\d.,]*\d)?").unwrap());

// Currency symbol or ISO code on either side of a numeric token.
static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?P<pre_cur>€|\$|£|¥|\b(?:EUR|USD|GBP|CHF|JPY|CAD|AUD|NZD|SEK|NOK|DKK|PLN|CZK))
        \s?(?P<pre_num>\d(?:[\d.,]*\d)?)
        |
        (?P<post_num>\d(?:[\d.,]*\d)?)\s?
        (?P<post_cur>€|\$|£|¥|(?:EUR|USD|GBP|CHF|JPY|CAD|AUD|NZD|SEK|NOK|DKK|PLN|CZK)\b)
        ",
    )
    .unwrap()
});

/// A price and/or currency found by one extraction layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceQuote {
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

impl PriceQuote {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.currency.is_none()
    }
}

/// Parse the first numeric token in `raw` as a price.
///
/// Separator rules:
/// - both `,` and `.` present: `,` groups thousands when the token ends in a
///   `.` followed by exactly two digits (`1,234.56`), otherwise `,` is the
///   decimal separator and `.` groups thousands (`1.234,56`);
/// - a single `,` is a decimal separator (`19,99`), several are groupings;
/// - a single `.` is a decimal separator, several are groupings.
pub fn normalize_price(raw: &str) -> Option<f64> {
    let token = NUMBER_RE.find(raw)?.as_str();

    let commas = token.matches(',').count();
    let dots = token.matches('.').count();

    let canonical = match (commas, dots) {
        (0, 0) => token.to_string(),
        (1, 0) => token.replace(',', "."),
        (_, 0) => token.replace(',', ""),
        (0, 1) => token.to_string(),
        (0, _) => token.replace('.', ""),
        _ if dot_then_two_digits(token) => token.replace(',', ""),
        _ => token.replace('.', "").replace(',', "."),
    };

    canonical.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn dot_then_two_digits(token: &str) -> bool {
    match token.rfind('.') {
        Some(pos) => {
            let tail = &token[pos + 1..];
            tail.len() == 2 && tail.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Find the first currency-adjacent number in visible page text.
pub fn scan_text_price(text: &str) -> Option<PriceQuote> {
    for caps in MONEY_RE.captures_iter(text) {
        let (number, currency) = match (caps.name("pre_num"), caps.name("post_num")) {
            (Some(num), _) => (num, caps.name("pre_cur")),
            (None, Some(num)) => (num, caps.name("post_cur")),
            (None, None) => continue,
        };

        if let Some(amount) = normalize_price(number.as_str()) {
            return Some(PriceQuote {
                amount: Some(amount),
                currency: currency.map(|c| c.as_str().to_string()),
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_decimal_comma() {
        assert_eq!(normalize_price("19,99"), Some(19.99));
    }

    #[test]
    fn test_normalize_thousands_comma() {
        assert_eq!(normalize_price("1,234.56"), Some(1234.56));
        assert_eq!(normalize_price("12,345,678.90"), Some(12345678.90));
    }

    #[test]
    fn test_normalize_european_grouping() {
        assert_eq!(normalize_price("1.234,56"), Some(1234.56));
        assert_eq!(normalize_price("1.234.567"), Some(1234567.0));
    }

    #[test]
    fn test_normalize_single_comma_is_decimal() {
        assert_eq!(normalize_price("1,299"), Some(1.299));
        assert_eq!(normalize_price("1,234,567"), Some(1234567.0));
    }

    #[test]
    fn test_normalize_plain_numbers() {
        assert_eq!(normalize_price("42"), Some(42.0));
        assert_eq!(normalize_price("19.95"), Some(19.95));
        assert_eq!(normalize_price("  EUR 7.50 incl. VAT"), Some(7.5));
    }

    #[test]
    fn test_normalize_rejects_non_numbers() {
        assert_eq!(normalize_price(""), None);
        assert_eq!(normalize_price("call for price"), None);
    }

    #[test]
    fn test_scan_symbol_before_number() {
        let quote = scan_text_price("Now only € 19,99 while stocks last").unwrap();
        assert_eq!(quote.amount, Some(19.99));
        assert_eq!(quote.currency.as_deref(), Some("€"));
    }

    #[test]
    fn test_scan_code_after_number() {
        let quote = scan_text_price("Price: 1,234.56 USD").unwrap();
        assert_eq!(quote.amount, Some(1234.56));
        assert_eq!(quote.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_scan_symbol_after_number() {
        let quote = scan_text_price("Prijs 24,95€").unwrap();
        assert_eq!(quote.amount, Some(24.95));
        assert_eq!(quote.currency.as_deref(), Some("€"));
    }

    #[test]
    fn test_scan_code_flush_against_number() {
        let quote = scan_text_price("Prijs EUR19,99").unwrap();
        assert_eq!(quote.amount, Some(19.99));
        assert_eq!(quote.currency.as_deref(), Some("EUR"));

        let quote = scan_text_price("Prijs 19,99EUR").unwrap();
        assert_eq!(quote.amount, Some(19.99));
        assert_eq!(quote.currency.as_deref(), Some("EUR"));

        let quote = scan_text_price("Now USD25.00").unwrap();
        assert_eq!(quote.amount, Some(25.0));
        assert_eq!(quote.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_scan_ignores_bare_numbers() {
        assert_eq!(scan_text_price("Order 3 items, ships in 2 days"), None);
        // Code must stand alone, not be part of a word.
        assert_eq!(scan_text_price("EURO2024 edition, 12 pieces"), None);
    }

    #[test]
    fn test_scan_takes_first_match() {
        let quote = scan_text_price("was $25.00 now $19.00").unwrap();
        assert_eq!(quote.amount, Some(25.0));
        assert_eq!(quote.currency.as_deref(), Some("$"));
    }
}
