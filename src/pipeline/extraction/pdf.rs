use lopdf::{Document, Object};

use super::types::{PageExtraction, PdfExtractor};
use super::ExtractionError;

/// Native text-layer extractor built on pdf-extract.
///
/// Pages carrying a `/Rotate` entry are normalized first so the text layer
/// comes out in reading order regardless of how the page was scanned in.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        let normalized = normalize_rotation(pdf_bytes)?;
        let source = normalized.as_deref().unwrap_or(pdf_bytes);

        let page_texts = pdf_extract::extract_text_from_mem_by_pages(source)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        let pages = page_texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let confidence = if text.trim().len() > 10 { 0.95 } else { 0.0 };
                PageExtraction {
                    page_number: i + 1,
                    text,
                    confidence,
                    language: None,
                }
            })
            .collect();

        Ok(pages)
    }
}

/// Strip `/Rotate` from every page and page-tree node.
///
/// Returns `Ok(None)` when no node was rotated so the caller keeps the
/// original bytes untouched.
fn normalize_rotation(pdf_bytes: &[u8]) -> Result<Option<Vec<u8>>, ExtractionError> {
    let mut doc = Document::load_mem(pdf_bytes).map_err(|e| {
        let msg = e.to_string();
        if msg.to_lowercase().contains("encrypt") {
            ExtractionError::PdfEncrypted
        } else {
            ExtractionError::PdfParsing(msg)
        }
    })?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(ExtractionError::PdfEncrypted);
    }

    let rotated = strip_rotation(&mut doc);
    if rotated == 0 {
        return Ok(None);
    }

    tracing::debug!(rotated, "Normalized page rotation before text extraction");
    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| ExtractionError::PdfParsing(format!("Failed to rewrite PDF: {e}")))?;
    Ok(Some(buf))
}

fn strip_rotation(doc: &mut Document) -> usize {
    let mut rotated = 0;
    for object in doc.objects.values_mut() {
        let Object::Dictionary(dict) = object else {
            continue;
        };
        let is_page_node = dict
            .get(b"Type")
            .and_then(|t| t.as_name())
            .map(|n| n == b"Page" || n == b"Pages")
            .unwrap_or(false);
        if !is_page_node {
            continue;
        }
        if let Some(rotate) = dict.remove(b"Rotate") {
            if rotate.as_i64().map(|deg| deg % 360 != 0).unwrap_or(false) {
                rotated += 1;
            }
        }
    }
    rotated
}

/// Mock native extractor returning fixed page texts, or failing.
pub struct MockPdfExtractor {
    pages: Vec<String>,
    fail: bool,
}

impl MockPdfExtractor {
    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            fail: false,
        }
    }

    /// A document with `count` pages and no text layer.
    pub fn blank(count: usize) -> Self {
        Self {
            pages: vec![String::new(); count],
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            pages: vec![],
            fail: true,
        }
    }
}

impl PdfExtractor for MockPdfExtractor {
    fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::PdfParsing("mock failure".into()));
        }
        Ok(self
            .pages
            .iter()
            .enumerate()
            .map(|(i, text)| PageExtraction {
                page_number: i + 1,
                text: text.clone(),
                confidence: if text.trim().len() > 10 { 0.95 } else { 0.0 },
                language: None,
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod test_pdf {
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    /// Build a single-page text PDF, optionally rotated. Each line of `text`
    /// becomes its own text-show operation.
    pub fn make_text_pdf(text: &str, rotate: Option<i64>) -> Vec<u8> {
        make_multi_page_pdf(&[text], rotate)
    }

    pub fn make_multi_page_pdf(pages: &[&str], rotate: Option<i64>) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for text in pages {
            let mut ops = String::from("BT /F1 12 Tf 14 TL 72 720 Td ");
            for line in text.lines() {
                let escaped = line.replace('(', "\\(").replace(')', "\\)");
                ops.push_str(&format!("({escaped}) Tj T* "));
            }
            ops.push_str("ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, ops.into_bytes()));

            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            };
            if let Some(deg) = rotate {
                page.set("Rotate", deg);
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}
