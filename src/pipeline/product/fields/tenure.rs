use std::sync::LazyLock;

use regex::Regex;

use super::ExtractionContext;
use crate::pipeline::product::types::{FieldExtraction, FieldValue, TenureRange, TenureUnit};

#[derive(Debug, Clone, Copy)]
enum Unit {
    Months,
    Years,
    Weeks,
}

impl Unit {
    fn to_months(self, value: u32) -> u32 {
        match self {
            Self::Months => value,
            Self::Years => value.saturating_mul(12),
            // Round half away from zero
            Self::Weeks => ((f64::from(value) * 12.0 / 52.0).round()) as u32,
        }
    }
}

static TENURE_PATTERNS: LazyLock<Vec<(Unit, Regex)>> = LazyLock::new(|| {
    [
        (Unit::Months, r"\b(\d+)\s*(?:months?|mo\.?)\b"),
        (Unit::Months, r"\b(\d+)\s*(?:mos?\.?)\b"),
        (Unit::Years, r"\b(\d+)\s*(?:years?|yrs?\.?)\b"),
        (Unit::Years, r"\b(\d+)\s*(?:y\.?)\b"),
        (Unit::Weeks, r"\b(\d+)\s*(?:weeks?|wks?\.?)\b"),
        (Unit::Weeks, r"\b(\d+)\s*(?:w\.?)\b"),
    ]
    .into_iter()
    .map(|(unit, p)| (unit, Regex::new(p).expect("valid regex")))
    .collect()
});

const TENURE_CONFIDENCE: f32 = 0.9;

pub(super) fn warm_up() -> usize {
    TENURE_PATTERNS.len()
}

/// Every duration in the document, in months, pooled across units.
/// The range spans the whole pool, not one stated range.
pub fn extract(ctx: &ExtractionContext<'_>) -> Option<FieldExtraction> {
    let lower = ctx.normalized.to_lowercase();
    let pool: Vec<u32> = TENURE_PATTERNS
        .iter()
        .flat_map(|(unit, re)| {
            re.captures_iter(&lower)
                .filter_map(|c| c[1].parse::<u32>().ok())
                .map(move |v| unit.to_months(v))
        })
        .collect();

    let min = *pool.iter().min()?;
    let max = *pool.iter().max()?;
    Some(FieldExtraction::new(
        FieldValue::TenureRange(TenureRange {
            min,
            max,
            unit: TenureUnit::Months,
        }),
        TENURE_CONFIDENCE,
    ))
}
