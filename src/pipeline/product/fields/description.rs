use super::ExtractionContext;
use crate::pipeline::product::types::{FieldExtraction, FieldValue};

const LEADING_SENTENCES: usize = 3;
const MIN_SENTENCE_LEN: usize = 20;
const EXCLUDED_TERMS: &[&str] = &["©", "copyright", "all rights reserved", "confidential"];

const DESCRIPTION_CONFIDENCE: f32 = 0.8;

/// Up to three leading sentences that read like prose. Always yields a
/// value; an empty description carries zero confidence.
pub fn extract(ctx: &ExtractionContext<'_>) -> Option<FieldExtraction> {
    let description = describe(&ctx.tokenizer.split(ctx.normalized));
    let confidence = if description.is_empty() {
        0.0
    } else {
        DESCRIPTION_CONFIDENCE
    };
    Some(FieldExtraction::new(FieldValue::Description(description), confidence))
}

fn describe(sentences: &[String]) -> String {
    sentences
        .iter()
        .take(LEADING_SENTENCES)
        .map(|s| s.trim())
        .filter(|s| is_prose(s))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_prose(sentence: &str) -> bool {
    if sentence.chars().count() <= MIN_SENTENCE_LEN {
        return false;
    }
    let lower = sentence.to_lowercase();
    if EXCLUDED_TERMS.iter().any(|t| lower.contains(t)) {
        return false;
    }
    sentence.ends_with(['.', '!', '?']) && sentence.chars().take(10).any(char::is_uppercase)
}
