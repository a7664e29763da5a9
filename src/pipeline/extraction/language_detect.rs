//! Lightweight language detection for acquired text.
//!
//! Product documents here are English, Filipino, or a Taglish mix. Scoring
//! is keyword frequency over whole words; English wins ties since the field
//! patterns are English-first.

/// Filipino function words and lending vocabulary.
const FILIPINO_INDICATORS: &[&str] = &[
    "ang", "ng", "mga", "sa", "na", "ay", "at", "para", "kung", "ito", "ko", "mo",
    "namin", "ninyo", "hindi", "may", "lamang", "din", "rin", "po",
    // Lending
    "utang", "pautang", "buwan", "taon", "linggo", "bayad", "hulog", "tubo",
    "negosyo", "halaga", "kabuuang", "kasapi", "ipon",
];

/// English function words and lending vocabulary.
const ENGLISH_INDICATORS: &[&str] = &[
    "the", "and", "for", "are", "with", "this", "that", "from", "will", "your",
    "you", "our", "have", "not", "may", "of", "to", "is",
    // Lending
    "loan", "credit", "card", "rate", "interest", "amount", "months", "years",
    "payment", "fee", "balance", "account", "savings", "collateral",
];

/// Detect the primary language of acquired text.
/// Returns a Tesseract-compatible code: "fil" or "eng".
pub fn detect_language(text: &str) -> String {
    if text.trim().len() < 20 {
        return "eng".to_string();
    }

    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let filipino = count_indicators(&words, FILIPINO_INDICATORS);
    let english = count_indicators(&words, ENGLISH_INDICATORS);

    if filipino > english {
        "fil".to_string()
    } else {
        "eng".to_string()
    }
}

fn count_indicators(words: &[&str], indicators: &[&str]) -> u32 {
    words.iter().filter(|w| indicators.contains(*w)).count() as u32
}
