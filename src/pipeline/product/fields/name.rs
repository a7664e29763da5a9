//! Product name: scored heading candidates from the top of the document,
//! with labeled-pattern fallback over paragraph sections.

use std::sync::LazyLock;

use regex::Regex;

use super::ExtractionContext;
use crate::pipeline::product::normalize::normalize_text;
use crate::pipeline::product::types::{FieldExtraction, FieldValue};

const CANDIDATE_LINES: usize = 50;
const MIN_LEN: usize = 4;
const MAX_LEN: usize = 120;
const MIN_ALPHA_RATIO: f32 = 0.5;

const GENERIC_TERMS: &[&str] = &[
    "table of contents",
    "confidential",
    "copyright",
    "all rights reserved",
    "terms and conditions",
    "page ",
    "section ",
    "rev.",
    "version",
    "updated",
    "applicant",
    "application form",
    "address",
    "contact",
    "email",
    "website",
];

const TYPE_TERMS: &[&str] = &["card", "loan", "account", "product", "credit", "savings", "microfinance"];

static PRODUCT_NAME_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)product\s+name:?\s*(.+)").expect("valid regex"));

static NAME_OF_PRODUCT_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)name\s+of\s+product:?\s*(.+)").expect("valid regex"));

// Anchored at a line start by the caller.
static TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)\A[A-Z][A-Za-z0-9\-\s]{3,80}$").expect("valid regex"));

pub(super) fn warm_up() -> usize {
    LazyLock::force(&PRODUCT_NAME_LABEL);
    LazyLock::force(&NAME_OF_PRODUCT_LABEL);
    LazyLock::force(&TITLE_LINE);
    3
}

pub fn extract(ctx: &ExtractionContext<'_>) -> Option<FieldExtraction> {
    if let Some((name, confidence)) = best_heading(ctx.raw_text) {
        return Some(FieldExtraction::new(FieldValue::Name(name), confidence));
    }

    let sections: Vec<&str> = if ctx.raw_text.contains("\n\n") {
        ctx.raw_text.split("\n\n").collect()
    } else {
        ctx.normalized.split("\n\n").collect()
    };
    sections
        .iter()
        .find_map(|s| labeled_name(s.trim()))
        .map(|(name, confidence)| FieldExtraction::new(FieldValue::Name(name), confidence))
}

/// Highest scoring heading-like line among the first lines of the document.
fn best_heading(raw_text: &str) -> Option<(String, f32)> {
    let window: Vec<&str> = raw_text.split('\n').map(str::trim).take(CANDIDATE_LINES).collect();

    let mut best: Option<&str> = None;
    let mut best_score = 0.0_f32;

    for (idx, &line) in window.iter().enumerate() {
        let len = line.chars().count();
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            continue;
        }
        if alpha_ratio(line) < MIN_ALPHA_RATIO || is_generic(line) {
            continue;
        }

        let mut score = 1.0_f32;
        score += (1.0 - idx as f32 / CANDIDATE_LINES as f32).max(0.0);
        if is_all_caps(line) {
            score += 0.5;
        } else if is_title_case(line) {
            score += 0.4;
        }

        let neighborhood = window[idx..(idx + 3).min(window.len())].join(" ").to_lowercase();
        if TYPE_TERMS.iter().any(|t| neighborhood.contains(t)) {
            score += 0.4;
        }
        // Trailing colon or period reads like a label or a sentence.
        if line.ends_with(':') || line.ends_with('.') {
            score -= 0.2;
        }

        if score > best_score {
            best_score = score;
            best = Some(line);
        }
    }

    best.map(|line| {
        let name = line.split_whitespace().collect::<Vec<_>>().join(" ");
        (name, (0.5 + best_score / 3.0).min(1.0))
    })
}

/// Explicitly labeled name, or a bare title line, within one section.
fn labeled_name(section: &str) -> Option<(String, f32)> {
    for (pattern, confidence) in [(&*PRODUCT_NAME_LABEL, 0.85), (&*NAME_OF_PRODUCT_LABEL, 0.85)] {
        if let Some(caps) = pattern.captures(section) {
            let name = normalize_text(&caps[1]);
            if name.chars().count() > 3 {
                return Some((name, confidence));
            }
        }
    }

    let title = title_line(section)?;
    let name = normalize_text(title);
    (name.chars().count() > 3).then_some((name, 0.65))
}

const TOC: &str = "table of contents";

/// First line start where a title-like run of words begins and reaches a
/// line end, skipping any that open with "table of contents".
fn title_line(section: &str) -> Option<&str> {
    let line_starts = std::iter::once(0).chain(section.match_indices('\n').map(|(i, _)| i + 1));
    for start in line_starts {
        let rest = &section[start..];
        if rest
            .get(..TOC.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(TOC))
        {
            continue;
        }
        if let Some(m) = TITLE_LINE.find(rest) {
            return Some(m.as_str());
        }
    }
    None
}

fn alpha_ratio(s: &str) -> f32 {
    let total = s.chars().count().max(1);
    let letters = s.chars().filter(|c| c.is_alphabetic()).count();
    letters as f32 / total as f32
}

fn is_generic(s: &str) -> bool {
    let lower = s.to_lowercase();
    GENERIC_TERMS.iter().any(|t| lower.contains(t))
}

/// At least one cased character and none lowercase.
fn is_all_caps(s: &str) -> bool {
    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase)
}

/// Every cased run starts uppercase and continues lowercase.
fn is_title_case(s: &str) -> bool {
    let mut seen_cased = false;
    let mut prev_cased = false;
    for c in s.chars() {
        if c.is_uppercase() {
            if prev_cased {
                return false;
            }
            prev_cased = true;
            seen_cased = true;
        } else if c.is_lowercase() {
            if !prev_cased {
                return false;
            }
            prev_cased = true;
            seen_cased = true;
        } else {
            prev_cased = false;
        }
    }
    seen_cased
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::product::fields::test_support::Fixture;

    fn name_of(raw: &str) -> Option<(String, f32)> {
        let fx = Fixture::new(raw);
        extract(&fx.ctx()).map(|f| match f.value {
            FieldValue::Name(n) => (n, f.confidence),
            other => panic!("unexpected value {other:?}"),
        })
    }

    #[test]
    fn all_caps_first_line_wins() {
        let (name, conf) = name_of(
            "PREMIUM REWARDS CARD\nEnjoy exclusive benefits on every purchase.\nAnnual fee waived.",
        )
        .unwrap();
        assert_eq!(name, "PREMIUM REWARDS CARD");
        assert_eq!(conf, 1.0);
    }

    #[test]
    fn generic_lines_skipped() {
        let (name, _) = name_of("Table of Contents\nCopyright 2024 Bank\nGold Savings Account\n").unwrap();
        assert_eq!(name, "Gold Savings Account");
    }

    #[test]
    fn short_and_numeric_lines_skipped() {
        let (name, _) = name_of("ABC\n12345 678 90\nEasy Cash Loan").unwrap();
        assert_eq!(name, "Easy Cash Loan");
    }

    #[test]
    fn label_lines_penalized() {
        // Same position bonus territory; the colon costs 0.2
        let (name, _) = name_of("Features:\nFlexi Loan").unwrap();
        assert_eq!(name, "Flexi Loan");
    }

    #[test]
    fn earlier_line_wins_ties_in_features() {
        let (name, _) = name_of("Starter Card\nTravel Card").unwrap();
        assert_eq!(name, "Starter Card");
    }

    #[test]
    fn inner_whitespace_collapsed() {
        let (name, _) = name_of("BLUE    PLATINUM   CARD").unwrap();
        assert_eq!(name, "BLUE PLATINUM CARD");
    }

    #[test]
    fn labeled_fallback_when_no_heading() {
        // Every line carries a generic term, so no heading candidate survives
        let raw = "Product name: Contact Saver\n\nCopyright 2024 Example Bank\n\nEmail us anytime";
        let (name, conf) = name_of(raw).unwrap();
        assert_eq!(name, "Contact Saver");
        assert!((conf - 0.85).abs() < 1e-6);
    }

    #[test]
    fn labeled_fallback_needs_more_than_three_chars() {
        assert!(labeled_name("Product name: AB").is_none());
    }

    #[test]
    fn title_line_fallback() {
        let (name, conf) = labeled_name("Gold Card\n*** 2024 ***").unwrap();
        assert_eq!(name, "Gold Card");
        assert!((conf - 0.65).abs() < 1e-6);
    }

    #[test]
    fn title_line_skips_table_of_contents() {
        assert_eq!(title_line("Table of contents\nHome Loan"), Some("Home Loan"));
    }

    #[test]
    fn title_line_may_span_lines() {
        assert_eq!(title_line("Gold Card\nfor members"), Some("Gold Card\nfor members"));
    }

    #[test]
    fn nothing_found_on_symbol_noise() {
        assert!(name_of("*** ### ***\n\n12/12/2024").is_none());
    }

    #[test]
    fn caps_predicates() {
        assert!(is_all_caps("GOLD CARD 2"));
        assert!(!is_all_caps("123"));
        assert!(is_title_case("Gold Card 2"));
        assert!(!is_title_case("Gold card"));
        assert!(!is_title_case("GOld"));
        assert!(!is_title_case("123"));
    }
}
