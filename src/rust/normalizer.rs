//! Text preprocessing for transaction descriptions.
//!
//! Two independent operations feed the classifier:
//! - [`CurrencyMap::normalize`] rewrites currency tokens into canonical symbols
//!   before tokenization.
//! - [`extract_amount`] pulls the first numeric value out of the raw text.
//!
//! Currency replacement is literal and case-sensitive. A token embedded in a
//! longer word is replaced as well, so `"transfers"` becomes `"transfe₹s"`,
//! while `"NPR"` and `"Rs"` are left untouched by the default table.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Decimal digit run (any script) with an optional single fractional part.
    static ref AMOUNT_REGEX: Regex = Regex::new(r"\d+(?:\.\d+)?").unwrap();

    static ref DECIMAL_DIGIT: Regex = Regex::new(r"^\d$").unwrap();

    static ref DEFAULT_CURRENCY_MAP: CurrencyMap = CurrencyMap::default();
}

/// Ordered table of literal currency tokens and their replacement symbols.
///
/// Entries are applied one after another in insertion order, each replacing
/// every occurrence of its token in the output of the previous entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyMap {
    entries: Vec<(String, String)>,
}

impl Default for CurrencyMap {
    fn default() -> Self {
        Self::new([
            ("npr", "₹"),
            ("rs", "₹"),
            ("rupees", "₹"),
            ("$", "USD"),
        ])
    }
}

impl CurrencyMap {
    /// Builds a table from `(token, symbol)` pairs. Empty tokens are dropped,
    /// since replacing the empty string would interleave the symbol between
    /// every character.
    ///
    /// # Example
    /// ```
    /// use txn_categorizer::CurrencyMap;
    ///
    /// let map = CurrencyMap::new([("eur", "€")]);
    /// assert_eq!(map.normalize("paid 20 eur"), "paid 20 €");
    /// ```
    pub fn new<T, S>(entries: impl IntoIterator<Item = (T, S)>) -> Self
    where
        T: Into<String>,
        S: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(token, symbol)| (token.into(), symbol.into()))
            .filter(|(token, _)| !token.is_empty())
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Applies every substitution in table order. Nothing else about the
    /// text changes: no case folding, no trimming.
    pub fn normalize(&self, text: &str) -> String {
        self.entries
            .iter()
            .fold(text.to_string(), |acc, (token, symbol)| acc.replace(token.as_str(), symbol))
    }
}

/// Normalizes `text` with the default currency table.
pub fn normalize(text: &str) -> String {
    DEFAULT_CURRENCY_MAP.normalize(text)
}

/// Returns the first number found in `text`, or `0.0` when there is none.
///
/// Only the first match counts: `"2 coffees for 300"` yields `2.0`. Digits of
/// any script are accepted, so `"Paid ५०० NPR"` yields `500.0`.
pub fn extract_amount(text: &str) -> f64 {
    AMOUNT_REGEX
        .find(text)
        .and_then(|m| to_ascii_number(m.as_str()))
        .and_then(|number| number.parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn to_ascii_number(matched: &str) -> Option<String> {
    matched
        .chars()
        .map(|c| match c {
            '.' => Some('.'),
            _ => digit_value(c).and_then(|d| char::from_digit(d, 10)),
        })
        .collect()
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DECIMAL_DIGIT.is_match(c.encode_utf8(&mut buf))
}

/// Value of a Unicode decimal digit. Decimal digits are encoded as contiguous
/// runs of complete 0-9 sequences, so the value is the offset from the start
/// of the run, modulo 10.
fn digit_value(c: char) -> Option<u32> {
    if let Some(d) = c.to_digit(10) {
        return Some(d);
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut start = c as u32;
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        start -= 1;
    }
    Some((c as u32 - start) % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_order() {
        let map = CurrencyMap::default();
        let tokens: Vec<&str> = map
            .entries()
            .iter()
            .map(|(token, _)| token.as_str())
            .collect();
        assert_eq!(tokens, vec!["npr", "rs", "rupees", "$"]);
    }

    #[test]
    fn test_normalize_is_case_sensitive() {
        assert_eq!(normalize("Paid NPR 350 for NTC mobile topup"), "Paid NPR 350 for NTC mobile topup");
        assert_eq!(normalize("paid npr 350"), "paid ₹ 350");
        assert_eq!(normalize("Sent Rs 2000"), "Sent Rs 2000");
    }

    #[test]
    fn test_normalize_replaces_inside_words() {
        assert_eq!(normalize("bank transfers"), "bank transfe₹s");
        assert_eq!(normalize("500 rupees"), "500 ₹");
    }

    #[test]
    fn test_normalize_dollar() {
        assert_eq!(normalize("$12 for coffee, $3 tip"), "USD12 for coffee, USD3 tip");
    }

    #[test]
    fn test_empty_tokens_are_dropped() {
        let map = CurrencyMap::new([("", "X"), ("eur", "€")]);
        assert_eq!(map.entries().len(), 1);
        assert_eq!(map.normalize("abc"), "abc");
    }

    #[test]
    fn test_extract_amount() {
        assert_eq!(extract_amount("Paid NPR 350 for NTC mobile topup"), 350.0);
        assert_eq!(extract_amount("Sent Rs 2000 to Sita Bank for tuition"), 2000.0);
        assert_eq!(extract_amount("lunch 12.75 then 40"), 12.75);
        assert_eq!(extract_amount("version 1.2.3"), 1.2);
        assert_eq!(extract_amount("350. rupees"), 350.0);
    }

    #[test]
    fn test_digit_value_across_scripts() {
        assert_eq!(digit_value('7'), Some(7));
        assert_eq!(digit_value('०'), Some(0));
        assert_eq!(digit_value('९'), Some(9));
        assert_eq!(digit_value('٣'), Some(3));
        // Mathematical digits are five back-to-back 0-9 runs.
        assert_eq!(digit_value('𝟓'), Some(5));
        assert_eq!(digit_value('𝟿'), Some(9));
        assert_eq!(digit_value('x'), None);
        assert_eq!(digit_value('.'), None);
    }

    #[test]
    fn test_extract_amount_non_ascii_digits() {
        assert_eq!(extract_amount("Paid ५०० NPR for momo"), 500.0);
        assert_eq!(extract_amount("१२.५ rupees"), 12.5);
        assert_eq!(extract_amount("total ٣٥٠"), 350.0);
    }

    #[test]
    fn test_extract_amount_without_digits() {
        assert_eq!(extract_amount("no numbers here"), 0.0);
        assert_eq!(extract_amount(""), 0.0);
    }
}
