use std::sync::LazyLock;

use regex::Regex;

use super::ExtractionContext;
use crate::pipeline::product::types::{FieldExtraction, FieldValue};

const SEGMENT_CONFIDENCE: f32 = 0.8;

/// Segment lexicon in output order.
static SEGMENTS: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    let lexicon: &[(&str, &[&str])] = &[
        ("Young Professionals", &[r"young\s+professionals?", r"early\s+career"]),
        ("Students", &[r"students?", r"education"]),
        ("Affluent", &[r"affluent", r"high\s+net\s+worth", r"premium"]),
        ("Rural", &[r"rural", r"farming", r"agriculture"]),
        ("Women", &[r"women", r"female", r"gender"]),
        ("Senior Citizens", &[r"senior\s+citizens?", r"elderly", r"retirees?"]),
        ("SME", &[r"sme", r"small\s+business", r"entrepreneurs?"]),
    ];
    lexicon
        .iter()
        .map(|(segment, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("valid regex"))
                .collect();
            (*segment, compiled)
        })
        .collect()
});

pub(super) fn warm_up() -> usize {
    SEGMENTS.iter().map(|(_, p)| p.len()).sum()
}

pub fn extract(ctx: &ExtractionContext<'_>) -> Option<FieldExtraction> {
    let lower = ctx.normalized.to_lowercase();
    let found: Vec<String> = SEGMENTS
        .iter()
        .filter(|(_, patterns)| patterns.iter().any(|p| p.is_match(&lower)))
        .map(|(segment, _)| segment.to_string())
        .collect();

    if found.is_empty() {
        return None;
    }
    Some(FieldExtraction::new(FieldValue::TargetSegments(found), SEGMENT_CONFIDENCE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::product::fields::test_support::Fixture;

    fn segments_of(text: &str) -> Option<Vec<String>> {
        let fx = Fixture::new(text);
        extract(&fx.ctx()).map(|f| match f.value {
            FieldValue::TargetSegments(s) => s,
            other => panic!("unexpected value {other:?}"),
        })
    }

    #[test]
    fn segments_listed_in_lexicon_order() {
        let found = segments_of("For small business owners, retirees and young professionals").unwrap();
        assert_eq!(found, vec!["Young Professionals", "Senior Citizens", "SME"]);
    }

    #[test]
    fn premium_means_affluent() {
        assert_eq!(segments_of("PREMIUM REWARDS CARD").unwrap(), vec!["Affluent"]);
    }

    #[test]
    fn each_segment_listed_once() {
        let found = segments_of("Women entrepreneurs in rural farming communities").unwrap();
        assert_eq!(found, vec!["Rural", "Women", "SME"]);
    }

    #[test]
    fn no_segments_absent() {
        assert!(segments_of("Annual fee waived for the first year").is_none());
    }
}
