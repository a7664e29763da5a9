use std::sync::LazyLock;

use regex::Regex;

use super::ExtractionContext;
use crate::pipeline::product::types::{FieldExtraction, FieldValue, InterestRate, RateType};

// Priority order: the first family with a valid match decides.
static RATE_FAMILIES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+\.?\d*)%?\s*[–-]\s*(\d+\.?\d*)%",
        r"(?i)APR:?\s*(\d+\.?\d*)%?\s*[–-]\s*(\d+\.?\d*)%",
        r"(?i)(?:per annum|p\.a\.):?\s*(\d+\.?\d*)%?\s*[–-]\s*(\d+\.?\d*)%",
        r"(?i)monthly\s+rate:?\s*(\d+\.?\d*)%?\s*[–-]\s*(\d+\.?\d*)%",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

// A bare range directly after this label is still a monthly rate.
static MONTHLY_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)monthly\s+rate:?\s*$").expect("valid regex"));

const INTEREST_CONFIDENCE: f32 = 0.85;
const MONTHS_PER_YEAR: f64 = 12.0;

pub(super) fn warm_up() -> usize {
    LazyLock::force(&MONTHLY_LABEL);
    RATE_FAMILIES.len() + 1
}

pub fn extract(ctx: &ExtractionContext<'_>) -> Option<FieldExtraction> {
    let (min, max) = first_valid_rate(ctx.normalized)?;
    Some(FieldExtraction::new(
        FieldValue::InterestRate(InterestRate {
            min,
            max,
            rate_type: RateType::Apr,
        }),
        INTEREST_CONFIDENCE,
    ))
}

/// Annualized `(min, max)` of the first structurally valid match.
fn first_valid_rate(text: &str) -> Option<(f64, f64)> {
    for family in RATE_FAMILIES.iter() {
        for caps in family.captures_iter(text) {
            let (Ok(mut min), Ok(mut max)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) else {
                continue;
            };
            let Some(whole) = caps.get(0) else { continue };

            let monthly = whole.as_str().to_lowercase().contains("monthly")
                || MONTHLY_LABEL.is_match(&text[..whole.start()]);
            if monthly {
                min *= MONTHS_PER_YEAR;
                max *= MONTHS_PER_YEAR;
            }

            if 0.0 <= min && min <= max && max <= 100.0 {
                return Some((min, max));
            }
        }
    }
    None
}
