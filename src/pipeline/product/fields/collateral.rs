use std::sync::LazyLock;

use regex::Regex;

use super::ExtractionContext;
use crate::pipeline::product::types::{FieldExtraction, FieldValue};

/// Ordered rules; the first one that matches decides.
static COLLATERAL_RULES: LazyLock<Vec<(Regex, bool, f32)>> = LazyLock::new(|| {
    [
        (r"no\s+collateral\s+required", false, 0.95),
        (r"collateral\s+required", true, 0.90),
        (r"unsecured", false, 0.85),
    ]
    .into_iter()
    .map(|(p, required, conf)| (Regex::new(p).expect("valid regex"), required, conf))
    .collect()
});

pub(super) fn warm_up() -> usize {
    COLLATERAL_RULES.len()
}

pub fn extract(ctx: &ExtractionContext<'_>) -> Option<FieldExtraction> {
    let lower = ctx.normalized.to_lowercase();
    COLLATERAL_RULES
        .iter()
        .find(|(re, _, _)| re.is_match(&lower))
        .map(|(_, required, conf)| FieldExtraction::new(FieldValue::CollateralRequired(*required), *conf))
}
