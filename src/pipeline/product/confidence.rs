use std::sync::LazyLock;

use regex::Regex;

use super::types::{ComplianceStatus, ProductInfoDraft, ProductInfoFinal};
use crate::pipeline::extraction::ExtractedTable;

/// Maximum relative gap between a table bound and the text bound.
const TABLE_TOLERANCE: f64 = 0.2;

const AMOUNT_COLUMN_TERMS: &[&str] = &["amount", "limit", "loan", "credit"];

static NUMERIC_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[,.]?\d*$").expect("valid regex"));

pub(super) fn warm_up() -> usize {
    LazyLock::force(&NUMERIC_CELL);
    1
}

/// Whether any amount-like table column spans roughly the same range.
///
/// A column agrees when both its minimum and maximum sit within 20% of the
/// extracted bounds. Columns with a zero bound cannot be compared.
pub fn cross_validate_amount(tables: &[ExtractedTable], min: f64, max: f64) -> bool {
    tables.iter().filter(|table| !table.is_empty()).any(|table| {
        table
            .columns
            .iter()
            .filter(|col| {
                let lower = col.to_lowercase();
                AMOUNT_COLUMN_TERMS.iter().any(|t| lower.contains(t))
            })
            .any(|col| column_agrees(table, col, min, max))
    })
}

fn column_agrees(table: &ExtractedTable, column: &str, min: f64, max: f64) -> bool {
    let values: Vec<f64> = table
        .rows
        .iter()
        .filter_map(|row| row.get(column))
        .map(|cell| cell.trim())
        .filter(|cell| NUMERIC_CELL.is_match(cell))
        .filter_map(|cell| cell.replace(',', "").parse::<f64>().ok())
        .collect();

    let Some(table_min) = values.iter().copied().reduce(f64::min) else {
        return false;
    };
    let table_max = values.iter().copied().fold(table_min, f64::max);
    if table_min == 0.0 || table_max == 0.0 {
        return false;
    }

    let min_gap = (table_min - min).abs() / table_min;
    let max_gap = (table_max - max).abs() / table_max;
    min_gap <= TABLE_TOLERANCE && max_gap <= TABLE_TOLERANCE
}

/// Threshold the draft into the public profile.
///
/// Every recorded confidence is reported; only fields at or above the
/// threshold carry a value.
pub fn finalize(draft: ProductInfoDraft, threshold: f32) -> ProductInfoFinal {
    let mut out = ProductInfoFinal::empty(draft.metadata);
    out.compliance_status = ComplianceStatus::PendingReview;
    out.confidence_scores = draft.confidences;

    for (field, value) in draft.values {
        match out.confidence_scores.get(&field) {
            Some(&c) if c >= threshold => out.set(value),
            Some(&c) => tracing::debug!(field = field.as_str(), confidence = c, "Field below threshold"),
            None => {}
        }
    }
    out
}
