use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Uploaded document as handed over by the caller. Never persisted.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Which acquisition tier produced the text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TextProvenance {
    Native,
    Recognized,
}

impl TextProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Recognized => "recognized",
        }
    }
}

/// Document text plus the tier it came from. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub provenance: TextProvenance,
}

/// A table recovered from the document layout.
/// Rows map column name to the raw cell string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedTable {
    pub columns: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

impl ExtractedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Output of the acquisition stage
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub text: ExtractedText,
    pub tables: Vec<ExtractedTable>,
    pub page_count: usize,
}

/// Per-page text from any tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExtraction {
    pub page_number: usize,
    pub text: String,
    pub confidence: f32,
    /// OCR language that produced the text, `None` for the native layer.
    pub language: Option<String>,
}

/// Raw OCR result from the engine
#[derive(Debug)]
pub struct OcrPageResult {
    pub text: String,
    pub confidence: f32,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    fn ocr_image_with_lang(
        &self,
        image_bytes: &[u8],
        lang: &str,
    ) -> Result<OcrPageResult, ExtractionError>;

    /// Languages this engine can actually serve; `None` means unknown.
    fn available_languages(&self) -> Option<Vec<String>> {
        None
    }
}

/// Native PDF text-layer extraction
pub trait PdfExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError>;
}

/// Renders one PDF page to an encoded image for OCR.
/// `page_index` is zero-based.
pub trait PdfPageRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// Best-effort table extraction, independent of the text tiers
pub trait TableExtractor {
    fn extract_tables(&self, pdf_bytes: &[u8]) -> Result<Vec<ExtractedTable>, ExtractionError>;
}

/// One tier of the text acquisition chain.
///
/// `Ok(None)` means the tier ran but found no text; the next tier is tried.
pub trait AcquisitionStrategy {
    fn name(&self) -> &'static str;

    fn provenance(&self) -> TextProvenance;

    fn acquire(&self, pdf_bytes: &[u8]) -> Result<Option<Vec<PageExtraction>>, ExtractionError>;
}
