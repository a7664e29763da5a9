pub mod types;
pub mod sanitize;
pub mod preprocess;
pub mod pdf;
pub mod ocr;
pub mod language_detect;
pub mod table_detect;
pub mod pdf_renderer;
pub mod pdfium;
pub mod strategy;
pub mod orchestrator;

pub use types::*;
pub use sanitize::*;
pub use pdf::*;
pub use ocr::*;
pub use orchestrator::*;

use thiserror::Error;

/// Low-level engine failures. Individual tiers swallow these and move on;
/// only `AcquisitionError` reaches the caller.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF is encrypted or password-protected")]
    PdfEncrypted,

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Table extraction failed: {0}")]
    TableExtraction(String),

    #[error("Tessdata not found at: {0}")]
    TessdataNotFound(std::path::PathBuf),
}

/// Fatal acquisition outcome: no tier produced usable text.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("No text could be extracted from the document (tried: {})", .attempts.join(", "))]
    NoText { attempts: Vec<String> },

    #[error("No acquisition strategies configured")]
    NoStrategies,
}
