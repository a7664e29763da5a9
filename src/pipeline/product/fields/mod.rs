//! Field extractors.
//!
//! Each extractor is a pure function over a shared, read-only
//! [`ExtractionContext`] and yields at most one candidate. They are
//! independent of each other, so the orchestrator may run them in any order
//! or in parallel.

pub mod name;
pub mod amount;
pub mod tenure;
pub mod interest;
pub mod collateral;
pub mod segments;
pub mod description;

use crate::pipeline::extraction::ExtractedTable;
use crate::pipeline::resources::SentenceTokenizer;

use super::types::FieldExtraction;

/// Everything an extractor may look at. Shared immutably across threads.
#[derive(Debug, Clone)]
pub struct ExtractionContext<'a> {
    /// Sanitized text as acquired, line structure intact.
    pub raw_text: &'a str,
    /// Output of `normalize_text` over `raw_text`.
    pub normalized: &'a str,
    pub tables: &'a [ExtractedTable],
    pub confidence_threshold: f32,
    pub default_currency: &'a str,
    pub tokenizer: SentenceTokenizer,
}

pub type FieldExtractorFn = fn(&ExtractionContext<'_>) -> Option<FieldExtraction>;

/// The independent field extractors, by name.
pub const FIELD_EXTRACTORS: &[(&str, FieldExtractorFn)] = &[
    ("name", name::extract),
    ("amount_range", amount::extract),
    ("tenure_range", tenure::extract),
    ("interest_rate", interest::extract),
    ("collateral_required", collateral::extract),
    ("target_segments", segments::extract),
    ("description", description::extract),
];

pub(super) fn warm_up() -> usize {
    name::warm_up()
        + amount::warm_up()
        + tenure::warm_up()
        + interest::warm_up()
        + collateral::warm_up()
        + segments::warm_up()
}

/// Byte range of `text` covering `radius` characters either side of
/// `start..end`. Always lands on char boundaries.
pub(crate) fn char_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let from = match radius {
        0 => start,
        r => text[..start]
            .char_indices()
            .rev()
            .nth(r - 1)
            .map_or(0, |(i, _)| i),
    };
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| end + i);
    &text[from..to]
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_window_clamps_at_edges() {
        let text = "abcdefghij";
        assert_eq!(char_window(text, 4, 6, 2), "cdefgh");
        assert_eq!(char_window(text, 1, 2, 5), "abcdefg");
        assert_eq!(char_window(text, 8, 10, 50), "abcdefghij");
    }

    #[test]
    fn char_window_respects_multibyte() {
        let text = "₱₱₱ 100 ₱₱₱";
        let start = text.find("100").unwrap();
        assert_eq!(char_window(text, start, start + 3, 2), "₱ 100 ₱");
    }

    #[test]
    fn zero_radius_is_the_match() {
        assert_eq!(char_window("abcdef", 2, 4, 0), "cd");
    }

    #[test]
    fn extractor_table_is_complete() {
        let names: Vec<_> = FIELD_EXTRACTORS.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "name",
                "amount_range",
                "tenure_range",
                "interest_rate",
                "collateral_required",
                "target_segments",
                "description"
            ]
        );
    }
}
