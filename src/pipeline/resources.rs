//! Process-wide read-only resources.
//!
//! `initialize()` is called once at process start. It compiles the regex
//! lexicons up front and switches description extraction to Unicode sentence
//! segmentation. Calling it again is a no-op. Without it, the pipeline still
//! works: lexicons compile lazily on first use and sentences are split with
//! the simple punctuation splitter.

use std::sync::OnceLock;

use unicode_segmentation::UnicodeSegmentation;

static TOKENIZER: OnceLock<SentenceTokenizer> = OnceLock::new();

/// Sentence splitter used by the description extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceTokenizer {
    /// UAX #29 sentence boundaries.
    Unicode,
    /// Split after `.`, `!` or `?` followed by whitespace or end of text.
    Simple,
}

impl SentenceTokenizer {
    pub fn split(&self, text: &str) -> Vec<String> {
        match self {
            Self::Unicode => text
                .unicode_sentences()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Self::Simple => split_on_terminators(text),
        }
    }
}

fn split_on_terminators(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if at_boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Idempotent process-start initialization.
pub fn initialize() {
    let mut first = false;
    TOKENIZER.get_or_init(|| {
        first = true;
        SentenceTokenizer::Unicode
    });
    if first {
        let patterns = super::product::warm_up();
        tracing::info!(patterns, "Extraction resources initialized");
    }
}

/// Tokenizer selected at startup, `Simple` if `initialize()` never ran.
pub fn sentence_tokenizer() -> SentenceTokenizer {
    TOKENIZER.get().copied().unwrap_or(SentenceTokenizer::Simple)
}
