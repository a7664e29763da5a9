/// Sanitize acquired text before it reaches the field extractors.
/// Strips control characters and stray glyphs, keeps currency symbols and
/// rate punctuation, trims each line, and folds runs of blank lines into a
/// single paragraph break.
pub fn sanitize_extracted_text(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter(|c| {
            c.is_alphanumeric()
                || c.is_whitespace()
                || matches!(
                    c,
                    '.' | ','
                        | ';'
                        | ':'
                        | '-'
                        | '/'
                        | '('
                        | ')'
                        | '['
                        | ']'
                        | '+'
                        | '='
                        | '%'
                        | '#'
                        | '@'
                        | '&'
                        | '\''
                        | '"'
                        | '!'
                        | '?'
                        | '*'
                        | '_'
                        | '|'
                        | '©'
                        | '₱'
                        | '$'
                        | '€'
                        | '£'
                        | '\u{2010}' // Hyphen ‐
                        | '\u{2013}' // En-dash –
                        | '\u{2014}' // Em-dash —
                        | '\u{2212}' // Minus sign −
                        | '\u{2019}'
                        | '\u{2018}'
                        | '\u{201C}'
                        | '\u{201D}'
                )
        })
        .collect();

    let mut out: Vec<&str> = Vec::new();
    for line in filtered.lines() {
        let trimmed = line.trim_matches(|c: char| c == ' ' || c == '\r' || c == '\u{a0}');
        if trimmed.trim().is_empty() {
            if out.last().is_some_and(|l| !l.is_empty()) {
                out.push("");
            }
            continue;
        }
        out.push(trimmed);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        let raw = "Loan amount\x00: 5,000\x01\x02\nTenure: 12 months";
        let clean = sanitize_extracted_text(raw);
        assert!(!clean.contains('\x00'));
        assert!(!clean.contains('\x01'));
        assert!(clean.contains("5,000"));
        assert!(clean.contains("12 months"));
    }

    #[test]
    fn preserves_currency_and_rate_punctuation() {
        let raw = "Credit limit: ₱10,000 \u{2013} ₱50,000 (APR 15% - 20%)";
        let clean = sanitize_extracted_text(raw);
        assert_eq!(clean, raw);
    }

    #[test]
    fn preserves_dollar_euro_pound() {
        let clean = sanitize_extracted_text("$100 €200 £300");
        assert_eq!(clean, "$100 €200 £300");
    }

    #[test]
    fn folds_blank_line_runs_into_one_paragraph_break() {
        let raw = "Line one\n\n\n\nLine two\n   \n\nLine three";
        let clean = sanitize_extracted_text(raw);
        assert_eq!(clean, "Line one\n\nLine two\n\nLine three");
    }

    #[test]
    fn trims_whitespace_per_line() {
        let raw = "  leading spaces  \n  trailing too  ";
        assert_eq!(sanitize_extracted_text(raw), "leading spaces\ntrailing too");
    }

    #[test]
    fn drops_leading_and_trailing_blank_lines() {
        assert_eq!(sanitize_extracted_text("\n\n  body  \n\n"), "body");
    }

    #[test]
    fn empty_input_returns_empty() {
        assert_eq!(sanitize_extracted_text(""), "");
    }

    #[test]
    fn only_control_chars_returns_empty() {
        assert_eq!(sanitize_extracted_text("\x00\x01\x02"), "");
    }

    #[test]
    fn keeps_filipino_text() {
        let raw = "Pautang para sa maliliit na negosyo: ₱5,000";
        assert_eq!(sanitize_extracted_text(raw), raw);
    }
}
