use std::sync::LazyLock;

use regex::Regex;

use super::{char_window, ExtractionContext};
use crate::pipeline::product::confidence::cross_validate_amount;
use crate::pipeline::product::normalize::currency_code;
use crate::pipeline::product::types::{AmountRange, FieldExtraction, FieldValue};

static AMOUNT_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(₱|\$|€|£)?\s*([\d,]+\.?\d*)\s*[–-]\s*(₱|\$|€|£)?\s*([\d,]+\.?\d*)")
        .expect("valid regex")
});

const AMOUNT_KEYWORDS: &[&str] = &["amount", "limit", "loan", "credit", "balance"];
const CONTEXT_RADIUS: usize = 50;

const TABLE_VALIDATED_CONFIDENCE: f32 = 0.9;
const TEXT_ONLY_CONFIDENCE: f32 = 0.8;

pub(super) fn warm_up() -> usize {
    LazyLock::force(&AMOUNT_RANGE);
    1
}

pub fn extract(ctx: &ExtractionContext<'_>) -> Option<FieldExtraction> {
    let (range, heuristic) = best_amount_range(ctx.normalized, ctx.default_currency)?;
    if heuristic < ctx.confidence_threshold {
        tracing::debug!(heuristic, "Amount range below threshold");
        return None;
    }

    let confidence = if cross_validate_amount(ctx.tables, range.min, range.max) {
        TABLE_VALIDATED_CONFIDENCE
    } else {
        TEXT_ONLY_CONFIDENCE
    };
    Some(FieldExtraction::new(FieldValue::AmountRange(range), confidence))
}

/// Most plausible amount range in the text and its heuristic confidence.
/// Earlier matches win ties.
fn best_amount_range(text: &str, default_currency: &str) -> Option<(AmountRange, f32)> {
    let mut best = None;
    let mut best_confidence = 0.0_f32;

    for caps in AMOUNT_RANGE.captures_iter(text) {
        let (Some(min), Some(max)) = (parse_amount(&caps[2]), parse_amount(&caps[4])) else {
            continue;
        };
        let Some(whole) = caps.get(0) else { continue };

        let currency = caps
            .get(1)
            .or_else(|| caps.get(3))
            .and_then(|m| currency_code(m.as_str()))
            .unwrap_or(default_currency);

        let context = char_window(text, whole.start(), whole.end(), CONTEXT_RADIUS);
        let confidence = amount_confidence(min, max, context);
        if confidence > best_confidence {
            best_confidence = confidence;
            best = Some(AmountRange {
                min,
                max,
                currency: currency.to_string(),
            });
        }
    }

    best.map(|range| (range, best_confidence))
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}

/// Multiplicative penalties: inverted range, negative values, and no
/// amount-like keyword nearby.
fn amount_confidence(min: f64, max: f64, context: &str) -> f32 {
    let mut confidence = 1.0_f32;
    if min > max {
        confidence *= 0.5;
    }
    if min < 0.0 || max < 0.0 {
        confidence *= 0.3;
    }
    let context = context.to_lowercase();
    if !AMOUNT_KEYWORDS.iter().any(|k| context.contains(k)) {
        confidence *= 0.7;
    }
    confidence
}
