use super::sanitize::sanitize_extracted_text;
use super::types::{Acquisition, AcquisitionStrategy, ExtractedText, TableExtractor};
use super::AcquisitionError;

/// Document text/table acquirer.
///
/// Strategies are tried in order, each once, until one yields text. Table
/// extraction runs independently of the text tiers and never fails the
/// acquisition.
pub struct DocumentAcquirer {
    strategies: Vec<Box<dyn AcquisitionStrategy + Send + Sync>>,
    table_extractor: Option<Box<dyn TableExtractor + Send + Sync>>,
}

impl DocumentAcquirer {
    pub fn new(strategies: Vec<Box<dyn AcquisitionStrategy + Send + Sync>>) -> Self {
        Self {
            strategies,
            table_extractor: None,
        }
    }

    pub fn with_table_extractor(mut self, extractor: Box<dyn TableExtractor + Send + Sync>) -> Self {
        self.table_extractor = Some(extractor);
        self
    }

    pub fn acquire(&self, pdf_bytes: &[u8]) -> Result<Acquisition, AcquisitionError> {
        if self.strategies.is_empty() {
            return Err(AcquisitionError::NoStrategies);
        }

        let tables = match &self.table_extractor {
            Some(extractor) => extractor.extract_tables(pdf_bytes).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Table extraction failed, continuing without tables");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            attempts.push(strategy.name().to_string());

            let pages = match strategy.acquire(pdf_bytes) {
                Ok(Some(pages)) => pages,
                Ok(None) => {
                    tracing::info!(strategy = strategy.name(), "Strategy produced no text");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), error = %e, "Strategy failed");
                    continue;
                }
            };

            let page_count = pages.len();
            let text = pages
                .iter()
                .map(|p| sanitize_extracted_text(&p.text))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n");

            // Sanitizing can leave nothing behind (stray glyphs only).
            if text.is_empty() {
                tracing::info!(strategy = strategy.name(), "Strategy text empty after sanitizing");
                continue;
            }

            tracing::info!(
                strategy = strategy.name(),
                provenance = strategy.provenance().as_str(),
                pages = page_count,
                tables = tables.len(),
                text_length = text.len(),
                "Text acquisition complete"
            );

            return Ok(Acquisition {
                text: ExtractedText {
                    text,
                    provenance: strategy.provenance(),
                },
                tables,
                page_count,
            });
        }

        Err(AcquisitionError::NoText { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::pdf::MockPdfExtractor;
    use crate::pipeline::extraction::pdfium::MockPdfPageRenderer;
    use crate::pipeline::extraction::strategy::{NativeTextStrategy, OcrStrategy};
    use crate::pipeline::extraction::table_detect::MockTableExtractor;
    use crate::pipeline::extraction::types::{ExtractedTable, TextProvenance};
    use std::collections::BTreeMap;

    fn acquirer(native: MockPdfExtractor, ocr: MockOcrEngine) -> DocumentAcquirer {
        DocumentAcquirer::new(vec![
            Box::new(NativeTextStrategy::new(Box::new(native))),
            Box::new(OcrStrategy::new(
                Box::new(MockPdfPageRenderer::new(2)),
                Box::new(ocr),
                vec!["eng".into(), "fil".into()],
                300,
            )),
        ])
    }

    fn loan_table() -> ExtractedTable {
        let mut row = BTreeMap::new();
        row.insert("Loan Amount".to_string(), "5,000".to_string());
        ExtractedTable {
            columns: vec!["Loan Amount".to_string()],
            rows: vec![row],
        }
    }

    #[test]
    fn native_text_wins_when_present() {
        let acq = acquirer(
            MockPdfExtractor::with_pages(&["Personal Loan\x00", "Loan amount: 5,000 - 10,000"]),
            MockOcrEngine::new("should not be used", 0.9),
        );
        let out = acq.acquire(b"%PDF").unwrap();
        assert_eq!(out.text.provenance, TextProvenance::Native);
        assert_eq!(out.text.text, "Personal Loan\n\nLoan amount: 5,000 - 10,000");
        assert_eq!(out.page_count, 2);
    }

    #[test]
    fn falls_back_to_ocr_without_text_layer() {
        let acq = acquirer(MockPdfExtractor::blank(2), MockOcrEngine::new("Micro loan", 0.8));
        let out = acq.acquire(b"%PDF").unwrap();
        assert_eq!(out.text.provenance, TextProvenance::Recognized);
        assert_eq!(out.text.text, "Micro loan\n\nMicro loan");
    }

    #[test]
    fn native_parse_error_falls_back_to_ocr() {
        let acq = acquirer(MockPdfExtractor::failing(), MockOcrEngine::new("Savings", 0.8));
        let out = acq.acquire(b"%PDF").unwrap();
        assert_eq!(out.text.provenance, TextProvenance::Recognized);
    }

    #[test]
    fn no_text_anywhere_is_acquisition_error() {
        let acq = acquirer(
            MockPdfExtractor::blank(2),
            MockOcrEngine::new("", 0.0).failing_for("eng").failing_for("fil"),
        );
        let err = acq.acquire(b"%PDF").unwrap_err();
        match err {
            AcquisitionError::NoText { attempts } => {
                assert_eq!(attempts, vec!["native_text", "ocr"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_strategy_list_rejected() {
        let err = DocumentAcquirer::new(vec![]).acquire(b"%PDF").unwrap_err();
        assert!(matches!(err, AcquisitionError::NoStrategies));
    }

    #[test]
    fn tables_attached_to_result() {
        let acq = acquirer(
            MockPdfExtractor::with_pages(&["Loan amount: 5,000 - 10,000"]),
            MockOcrEngine::new("", 0.0),
        )
        .with_table_extractor(Box::new(MockTableExtractor::new(vec![loan_table()])));
        let out = acq.acquire(b"%PDF").unwrap();
        assert_eq!(out.tables.len(), 1);
    }

    #[test]
    fn table_failure_does_not_fail_acquisition() {
        let acq = acquirer(
            MockPdfExtractor::with_pages(&["Loan amount: 5,000 - 10,000"]),
            MockOcrEngine::new("", 0.0),
        )
        .with_table_extractor(Box::new(MockTableExtractor::failing()));
        let out = acq.acquire(b"%PDF").unwrap();
        assert!(out.tables.is_empty());
        assert_eq!(out.text.provenance, TextProvenance::Native);
    }
}
