//! The two text acquisition tiers.

use super::preprocess::to_grayscale_png;
use super::types::{
    AcquisitionStrategy, OcrEngine, PageExtraction, PdfExtractor, PdfPageRenderer, TextProvenance,
};
use super::ExtractionError;

/// Tier 1: the document's own text layer.
pub struct NativeTextStrategy {
    pdf: Box<dyn PdfExtractor + Send + Sync>,
}

impl NativeTextStrategy {
    pub fn new(pdf: Box<dyn PdfExtractor + Send + Sync>) -> Self {
        Self { pdf }
    }
}

impl AcquisitionStrategy for NativeTextStrategy {
    fn name(&self) -> &'static str {
        "native_text"
    }

    fn provenance(&self) -> TextProvenance {
        TextProvenance::Native
    }

    fn acquire(&self, pdf_bytes: &[u8]) -> Result<Option<Vec<PageExtraction>>, ExtractionError> {
        let pages = self.pdf.extract_text(pdf_bytes)?;
        if pages.iter().all(|p| p.text.trim().is_empty()) {
            tracing::debug!(pages = pages.len(), "No native text layer");
            return Ok(None);
        }
        Ok(Some(pages))
    }
}

/// Tier 2: rasterize every page and run OCR, language by language.
pub struct OcrStrategy {
    renderer: Box<dyn PdfPageRenderer + Send + Sync>,
    ocr: Box<dyn OcrEngine + Send + Sync>,
    languages: Vec<String>,
    dpi: u32,
}

impl OcrStrategy {
    pub fn new(
        renderer: Box<dyn PdfPageRenderer + Send + Sync>,
        ocr: Box<dyn OcrEngine + Send + Sync>,
        languages: Vec<String>,
        dpi: u32,
    ) -> Self {
        Self {
            renderer,
            ocr,
            languages,
            dpi,
        }
    }

    /// Configured languages the engine can serve, in configured order.
    fn usable_languages(&self) -> Vec<&str> {
        match self.ocr.available_languages() {
            Some(installed) => self
                .languages
                .iter()
                .filter(|l| installed.contains(*l))
                .map(String::as_str)
                .collect(),
            None => self.languages.iter().map(String::as_str).collect(),
        }
    }

    /// First language that yields non-empty text for this page image.
    fn recognize_page(&self, image: &[u8], page_number: usize, languages: &[&str]) -> Option<PageExtraction> {
        for &lang in languages {
            match self.ocr.ocr_image_with_lang(image, lang) {
                Ok(result) if !result.text.trim().is_empty() => {
                    return Some(PageExtraction {
                        page_number,
                        text: result.text,
                        confidence: result.confidence,
                        language: Some(lang.to_string()),
                    });
                }
                Ok(_) => {
                    tracing::debug!(page = page_number, lang, "OCR produced no text");
                }
                Err(e) => {
                    tracing::warn!(page = page_number, lang, error = %e, "OCR failed");
                }
            }
        }
        None
    }
}

impl AcquisitionStrategy for OcrStrategy {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn provenance(&self) -> TextProvenance {
        TextProvenance::Recognized
    }

    fn acquire(&self, pdf_bytes: &[u8]) -> Result<Option<Vec<PageExtraction>>, ExtractionError> {
        let page_count = self.renderer.page_count(pdf_bytes)?;
        let languages = self.usable_languages();
        if languages.is_empty() {
            return Err(ExtractionError::OcrInit(
                "None of the configured OCR languages are installed".into(),
            ));
        }

        let mut pages = Vec::with_capacity(page_count);
        for index in 0..page_count {
            let page_number = index + 1;
            let image = match self
                .renderer
                .render_page(pdf_bytes, index, self.dpi)
                .and_then(|raw| to_grayscale_png(&raw))
            {
                Ok(image) => image,
                Err(e) => {
                    tracing::warn!(page = page_number, error = %e, "Page rasterization failed");
                    continue;
                }
            };

            if let Some(page) = self.recognize_page(&image, page_number, &languages) {
                pages.push(page);
            }
        }

        tracing::info!(
            pages = page_count,
            recognized = pages.len(),
            dpi = self.dpi,
            "OCR tier complete"
        );

        Ok((!pages.is_empty()).then_some(pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::pdf::MockPdfExtractor;
    use crate::pipeline::extraction::pdfium::MockPdfPageRenderer;
    use crate::pipeline::extraction::types::OcrPageResult;

    fn langs() -> Vec<String> {
        vec!["eng".to_string(), "fil".to_string()]
    }

    #[test]
    fn native_returns_pages_with_text() {
        let strategy = NativeTextStrategy::new(Box::new(MockPdfExtractor::with_pages(&[
            "Personal Loan",
            "",
        ])));
        let pages = strategy.acquire(&[]).unwrap().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(strategy.provenance(), TextProvenance::Native);
    }

    #[test]
    fn native_blank_layer_yields_none() {
        let strategy = NativeTextStrategy::new(Box::new(MockPdfExtractor::blank(3)));
        assert!(strategy.acquire(&[]).unwrap().is_none());
    }

    #[test]
    fn native_propagates_parse_error() {
        let strategy = NativeTextStrategy::new(Box::new(MockPdfExtractor::failing()));
        assert!(strategy.acquire(&[]).is_err());
    }

    #[test]
    fn ocr_uses_primary_language_first() {
        let engine = MockOcrEngine::new("", 0.8)
            .with_language("eng", "Credit card application")
            .with_language("fil", "Aplikasyon");
        let strategy = OcrStrategy::new(Box::new(MockPdfPageRenderer::new(1)), Box::new(engine), langs(), 300);
        let pages = strategy.acquire(&[]).unwrap().unwrap();
        assert_eq!(pages[0].text, "Credit card application");
        assert_eq!(pages[0].language.as_deref(), Some("eng"));
    }

    #[test]
    fn ocr_falls_back_to_secondary_language() {
        let engine = MockOcrEngine::new("", 0.7).with_language("fil", "Pautang para sa negosyo");
        let strategy = OcrStrategy::new(Box::new(MockPdfPageRenderer::new(2)), Box::new(engine), langs(), 300);
        let pages = strategy.acquire(&[]).unwrap().unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.language.as_deref() == Some("fil")));
        assert_eq!(pages[1].page_number, 2);
    }

    #[test]
    fn ocr_engine_failure_moves_to_next_language() {
        let engine = MockOcrEngine::new("Savings account", 0.9).failing_for("eng");
        let strategy = OcrStrategy::new(Box::new(MockPdfPageRenderer::new(1)), Box::new(engine), langs(), 300);
        let pages = strategy.acquire(&[]).unwrap().unwrap();
        assert_eq!(pages[0].language.as_deref(), Some("fil"));
    }

    #[test]
    fn ocr_no_text_anywhere_yields_none() {
        let engine = MockOcrEngine::new("   ", 0.1);
        let strategy = OcrStrategy::new(Box::new(MockPdfPageRenderer::new(2)), Box::new(engine), langs(), 300);
        assert!(strategy.acquire(&[]).unwrap().is_none());
    }

    struct EngOnlyEngine;

    impl OcrEngine for EngOnlyEngine {
        fn ocr_image_with_lang(&self, _: &[u8], lang: &str) -> Result<OcrPageResult, ExtractionError> {
            assert_eq!(lang, "eng", "uninstalled language was requested");
            Ok(OcrPageResult {
                text: String::new(),
                confidence: 0.0,
            })
        }

        fn available_languages(&self) -> Option<Vec<String>> {
            Some(vec!["eng".to_string()])
        }
    }

    #[test]
    fn ocr_skips_uninstalled_languages() {
        let strategy = OcrStrategy::new(Box::new(MockPdfPageRenderer::new(1)), Box::new(EngOnlyEngine), langs(), 300);
        assert!(strategy.acquire(&[]).unwrap().is_none());
    }
}
