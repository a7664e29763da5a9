//! Document processing entry point.
//!
//! Drives one document through the whole pipeline:
//! intake → acquire text/tables → product extraction → optional fallback.
//!
//! Every engine sits behind a trait, so the processor is fully testable
//! with mock implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ExtractorConfig;
use crate::pipeline::extraction::pdf::PdfTextExtractor;
use crate::pipeline::extraction::pdf_renderer::LopdfImageExtractor;
use crate::pipeline::extraction::pdfium::PdfiumRenderer;
use crate::pipeline::extraction::strategy::{NativeTextStrategy, OcrStrategy};
use crate::pipeline::extraction::table_detect::LayoutTableExtractor;
use crate::pipeline::extraction::types::{OcrEngine, PdfPageRenderer, RawDocument};
use crate::pipeline::extraction::{AcquisitionError, DocumentAcquirer};
use crate::pipeline::intake::{self, IntakeError};
use crate::pipeline::product::fallback::{merge_fallback, OpenAiCompatibleExtractor, ProductFallback};
use crate::pipeline::product::{ProductExtractor, ProductInfoFinal};

/// Errors that end processing of a document without output.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Intake rejected document: {0}")]
    Intake(#[from] IntakeError),

    #[error("Acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Processing timed out after {0:?}")]
    Timeout(Duration),

    #[error("Processing task failed: {0}")]
    TaskJoin(String),

    #[error("OCR engine initialization failed: {0}")]
    OcrInit(String),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Validates, acquires and extracts one document at a time.
pub struct DocumentProcessor {
    acquirer: DocumentAcquirer,
    extractor: ProductExtractor,
    fallback: Option<Box<dyn ProductFallback + Send + Sync>>,
}

impl DocumentProcessor {
    pub fn new(acquirer: DocumentAcquirer, extractor: ProductExtractor) -> Self {
        Self {
            acquirer,
            extractor,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn ProductFallback + Send + Sync>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Full pipeline on the calling thread.
    ///
    /// The output depends only on the document bytes: identical input
    /// yields identical output.
    pub fn process(&self, doc: &RawDocument) -> Result<ProductInfoFinal, ProcessingError> {
        let fingerprint = intake::validate(doc)?;
        tracing::info!(
            doc_id = %fingerprint.document_id,
            filename = %fingerprint.filename,
            size_bytes = fingerprint.size_bytes,
            "Processing document"
        );

        let acquisition = self.acquirer.acquire(&doc.bytes)?;
        let mut out = self
            .extractor
            .extract(&acquisition.text.text, &acquisition.tables);

        if out.name.is_none() || out.product_type.is_none() {
            self.apply_fallback(&mut out, &acquisition.text.text);
        }

        tracing::info!(
            doc_id = %fingerprint.document_id,
            provenance = acquisition.text.provenance.as_str(),
            pages = acquisition.page_count,
            "Document processed"
        );
        Ok(out)
    }

    /// Ask the fallback to fill missing fields. Failures are logged only.
    fn apply_fallback(&self, out: &mut ProductInfoFinal, raw_text: &str) {
        let Some(fallback) = &self.fallback else {
            return;
        };
        match fallback.extract(raw_text) {
            Ok(proposal) => {
                let filled = merge_fallback(out, proposal, self.extractor.confidence_threshold());
                tracing::info!(
                    filled = ?filled.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
                    "Fallback extractor filled missing fields"
                );
            }
            Err(e) => tracing::warn!(error = %e, "Fallback extractor failed, keeping heuristic result"),
        }
    }

    /// Run `process` on the blocking pool so async callers are never
    /// stalled by PDF parsing or OCR.
    ///
    /// With a `timeout`, an overrunning document is abandoned and
    /// `ProcessingError::Timeout` returned; no partial result is produced.
    pub async fn process_async(
        self: Arc<Self>,
        doc: RawDocument,
        timeout: Option<Duration>,
    ) -> Result<ProductInfoFinal, ProcessingError> {
        let task = tokio::task::spawn_blocking(move || self.process(&doc));

        let joined = match timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| ProcessingError::Timeout(limit))?,
            None => task.await,
        };
        joined.map_err(|e| ProcessingError::TaskJoin(e.to_string()))?
    }

    /// `process_async` on a private runtime, for synchronous callers.
    ///
    /// The runtime is shut down without waiting for its blocking pool, so
    /// after a timeout the caller gets `ProcessingError::Timeout` right away
    /// while the abandoned acquisition finishes (and is discarded) in the
    /// background.
    pub fn process_with_deadline(
        self: Arc<Self>,
        doc: RawDocument,
        timeout: Option<Duration>,
    ) -> Result<ProductInfoFinal, ProcessingError> {
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        let result = runtime.block_on(self.process_async(doc, timeout));
        runtime.shutdown_background();
        result
    }
}

/// Build a `DocumentProcessor` with production engines.
///
/// - Tier 1: `PdfTextExtractor` (native text layer)
/// - Tier 2: PDFium renderer (lopdf image fallback) + `BundledTesseract`
///   when the `ocr` feature is enabled, otherwise a silent mock engine
/// - Tables: `LayoutTableExtractor`
/// - Fallback: OpenAI-compatible client when requested and configured
pub fn build_processor(
    config: &ExtractorConfig,
    llm_fallback: bool,
) -> Result<DocumentProcessor, ProcessingError> {
    let ocr = build_ocr_engine(config)?;
    let renderer = build_renderer();

    let acquirer = DocumentAcquirer::new(vec![
        Box::new(NativeTextStrategy::new(Box::new(PdfTextExtractor))),
        Box::new(OcrStrategy::new(
            renderer,
            ocr,
            config.ocr_languages.clone(),
            config.render_dpi,
        )),
    ])
    .with_table_extractor(Box::new(LayoutTableExtractor::new(Box::new(PdfTextExtractor))));

    let mut processor = DocumentProcessor::new(acquirer, ProductExtractor::new(config));

    if llm_fallback {
        match OpenAiCompatibleExtractor::from_env() {
            Ok(client) => {
                tracing::info!(model = client.model(), "Language-model fallback enabled");
                processor = processor.with_fallback(Box::new(client));
            }
            Err(e) => tracing::warn!(error = %e, "Language-model fallback unavailable"),
        }
    }

    Ok(processor)
}

/// PDFium when the library loads, otherwise embedded-image extraction.
fn build_renderer() -> Box<dyn PdfPageRenderer + Send + Sync> {
    match PdfiumRenderer::new() {
        Ok(renderer) => Box::new(renderer),
        Err(e) => {
            tracing::warn!(error = %e, "PDFium unavailable, OCR tier limited to embedded page images");
            Box::new(LopdfImageExtractor)
        }
    }
}

/// Build the OCR engine, respecting feature flags.
fn build_ocr_engine(
    config: &ExtractorConfig,
) -> Result<Box<dyn OcrEngine + Send + Sync>, ProcessingError> {
    #[cfg(feature = "ocr")]
    {
        if let Some(tessdata) = find_tessdata_dir(config) {
            let engine = crate::pipeline::extraction::ocr::BundledTesseract::new(&tessdata, &config.ocr_languages)
                .map_err(|e| ProcessingError::OcrInit(e.to_string()))?;
            tracing::info!(tessdata = %tessdata.display(), "Tesseract OCR initialized");
            return Ok(Box::new(engine));
        }
        tracing::warn!("Tesseract data not found, scanned documents cannot be read");
    }

    // Digital PDFs still work; scanned ones end in an acquisition error.
    tracing::info!(
        languages = ?config.ocr_languages,
        "Using mock OCR engine, image OCR unavailable"
    );
    Ok(Box::new(crate::pipeline::extraction::ocr::MockOcrEngine::new("", 0.0)))
}

/// Locate a tessdata directory holding the primary OCR language.
///
/// Checks `TESSDATA_PREFIX` first, then common system paths.
pub fn find_tessdata_dir(config: &ExtractorConfig) -> Option<PathBuf> {
    let primary = config.ocr_languages.first().map_or("eng", String::as_str);
    let traineddata = format!("{primary}.traineddata");

    let candidates = config.tessdata_dir.iter().cloned().chain(
        [
            "/usr/share/tesseract-ocr/5/tessdata",
            "/usr/share/tesseract-ocr/4.00/tessdata",
            "/usr/share/tessdata",
            "/usr/local/share/tessdata",
            "/opt/homebrew/share/tessdata",
        ]
        .into_iter()
        .map(PathBuf::from),
    );

    for dir in candidates {
        if dir.join(&traineddata).exists() {
            return Some(dir);
        }
    }
    None
}
