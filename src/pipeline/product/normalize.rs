use std::sync::LazyLock;

use regex::Regex;

/// Currency symbols recognized in amounts, with their ISO 4217 codes.
pub const CURRENCY_SYMBOLS: &[(&str, &str)] = &[("₱", "PHP"), ("$", "USD"), ("€", "EUR"), ("£", "GBP")];

static DASH_VARIANTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\u{2013}\u{2014}\u{2010}\u{2212}]").expect("valid regex"));

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

pub(super) fn warm_up() -> usize {
    LazyLock::force(&DASH_VARIANTS);
    LazyLock::force(&WHITESPACE_RUN);
    2
}

/// ISO code for a currency symbol, if known.
pub fn currency_code(symbol: &str) -> Option<&'static str> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, code)| *code)
}

/// Normalize document text for the regex field extractors.
///
/// Currency symbols get padded with spaces, dash variants become `-`,
/// whitespace runs (newlines included) collapse to one space. Idempotent.
pub fn normalize_text(text: &str) -> String {
    let mut padded = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        if is_currency_symbol(c) {
            padded.push(' ');
            padded.push(c);
            padded.push(' ');
        } else {
            padded.push(c);
        }
    }

    let dashed = DASH_VARIANTS.replace_all(&padded, "-");
    WHITESPACE_RUN.replace_all(&dashed, " ").trim().to_string()
}

fn is_currency_symbol(c: char) -> bool {
    let mut buf = [0u8; 4];
    let symbol: &str = c.encode_utf8(&mut buf);
    currency_code(symbol).is_some()
}
