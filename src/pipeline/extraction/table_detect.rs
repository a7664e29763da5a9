//! Layout-based table detection over the native text layer.
//!
//! A run of consecutive lines that split into the same number of cells
//! (by tab, pipe, or aligned multi-space gaps) is read as one table whose
//! first line is the header.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::types::{ExtractedTable, PdfExtractor, TableExtractor};
use super::ExtractionError;

/// Column gap in space-aligned layouts.
static SPACE_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {3,}").expect("valid regex"));

/// Minimum lines (header + one row) for a block to count as a table.
const MIN_TABLE_LINES: usize = 2;

/// Table extractor reading the native text layer through a `PdfExtractor`.
pub struct LayoutTableExtractor {
    pdf: Box<dyn PdfExtractor + Send + Sync>,
}

impl LayoutTableExtractor {
    pub fn new(pdf: Box<dyn PdfExtractor + Send + Sync>) -> Self {
        Self { pdf }
    }
}

impl TableExtractor for LayoutTableExtractor {
    fn extract_tables(&self, pdf_bytes: &[u8]) -> Result<Vec<ExtractedTable>, ExtractionError> {
        let pages = self
            .pdf
            .extract_text(pdf_bytes)
            .map_err(|e| ExtractionError::TableExtraction(e.to_string()))?;

        let tables: Vec<ExtractedTable> = pages
            .iter()
            .flat_map(|page| parse_tables_from_text(&page.text))
            .collect();

        tracing::debug!(
            pages = pages.len(),
            tables = tables.len(),
            "Layout table detection complete"
        );
        Ok(tables)
    }
}

/// Find every table block in a page of text.
pub fn parse_tables_from_text(text: &str) -> Vec<ExtractedTable> {
    let mut tables = Vec::new();
    let mut block: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        match split_cells(line) {
            Some(cells) if block.first().map_or(true, |h| h.len() == cells.len()) => {
                block.push(cells);
            }
            Some(cells) => {
                flush_block(&mut block, &mut tables);
                block.push(cells);
            }
            None => flush_block(&mut block, &mut tables),
        }
    }
    flush_block(&mut block, &mut tables);
    tables
}

fn flush_block(block: &mut Vec<Vec<String>>, tables: &mut Vec<ExtractedTable>) {
    if block.len() >= MIN_TABLE_LINES {
        let mut lines = block.drain(..);
        if let Some(columns) = lines.next() {
            let rows = lines
                .map(|cells| columns.iter().cloned().zip(cells).collect::<BTreeMap<_, _>>())
                .collect();
            tables.push(ExtractedTable { columns, rows });
        }
    }
    block.clear();
}

/// Split a line into cells, or `None` when it does not look tabular.
fn split_cells(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if trimmed.len() < 3 {
        return None;
    }

    let cells: Vec<String> = if trimmed.contains('\t') {
        trimmed.split('\t').map(|c| c.trim().to_string()).collect()
    } else if trimmed.matches('|').count() >= 1 {
        trimmed
            .trim_matches('|')
            .split('|')
            .map(|c| c.trim().to_string())
            .collect()
    } else {
        SPACE_GAP.split(trimmed).map(|c| c.trim().to_string()).collect()
    };

    let cells: Vec<String> = cells.into_iter().filter(|c| !c.is_empty()).collect();
    (cells.len() >= 2).then_some(cells)
}

/// Mock table extractor for orchestrator tests.
pub struct MockTableExtractor {
    tables: Vec<ExtractedTable>,
    fail: bool,
}

impl MockTableExtractor {
    pub fn new(tables: Vec<ExtractedTable>) -> Self {
        Self { tables, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            tables: vec![],
            fail: true,
        }
    }
}

impl TableExtractor for MockTableExtractor {
    fn extract_tables(&self, _pdf_bytes: &[u8]) -> Result<Vec<ExtractedTable>, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::TableExtraction("mock failure".into()));
        }
        Ok(self.tables.clone())
    }
}
