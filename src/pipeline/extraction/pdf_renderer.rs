//! Page images for scanned PDFs via lopdf.
//!
//! A scanned brochure or application form is usually one image XObject per
//! page. When PDFium is not installed we pull that image out directly and
//! hand it to OCR as PNG.

use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::types::PdfPageRenderer;
use super::ExtractionError;

/// Extracts the largest embedded image of each page. The `dpi` argument is
/// ignored: the scan's native resolution is what we get.
pub struct LopdfImageExtractor;

impl PdfPageRenderer for LopdfImageExtractor {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        let doc = load(pdf_bytes)?;
        Ok(doc.get_pages().len())
    }

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let doc = load(pdf_bytes)?;

        let page_ids: Vec<ObjectId> = doc.page_iter().collect();
        let &page_id = page_ids.get(page_index).ok_or_else(|| ExtractionError::PdfRendering {
            page: page_index,
            reason: format!("Page not found (PDF has {} pages)", page_ids.len()),
        })?;

        let img = largest_page_image(&doc, page_id)
            .map_err(|reason| ExtractionError::PdfRendering { page: page_index, reason })?;

        let mut png = Vec::new();
        img.write_to(&mut png, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::ImageProcessing(format!("Failed to encode PNG: {e}")))?;

        tracing::debug!(page = page_index, png_size = png.len(), "Extracted embedded page image");
        Ok(png)
    }
}

fn load(pdf_bytes: &[u8]) -> Result<Document, ExtractionError> {
    Document::load_mem(pdf_bytes)
        .map_err(|e| ExtractionError::PdfParsing(format!("Failed to parse PDF: {e}")))
}

/// Walk page → /Resources → /XObject and decode the image with the most
/// pixels.
fn largest_page_image(doc: &Document, page_id: ObjectId) -> Result<DynamicImage, String> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| format!("Page object error: {e}"))?;

    let resources = resolve_dict(doc, page, b"Resources")?;
    let xobjects = resolve_dict(doc, resources, b"XObject")?;

    let mut best: Option<(u64, DynamicImage)> = None;
    for (_, entry) in xobjects.iter() {
        let Object::Stream(stream) = resolve(doc, entry) else {
            continue;
        };
        if !is_image(&stream.dict) {
            continue;
        }
        let img = match decode_image_stream(stream) {
            Ok(img) => img,
            Err(reason) => {
                tracing::debug!(%reason, "Skipping undecodable image XObject");
                continue;
            }
        };
        let pixels = img.width() as u64 * img.height() as u64;
        if best.as_ref().map_or(true, |(prev, _)| pixels > *prev) {
            best = Some((pixels, img));
        }
    }

    best.map(|(_, img)| img)
        .ok_or_else(|| "No image XObjects found on this page".to_string())
}

fn is_image(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .and_then(Object::as_name)
        .map(|n| n == b"Image")
        .unwrap_or(false)
}

/// JPEG (DCTDecode) and self-describing streams decode directly; anything
/// else is treated as raw samples described by the image dictionary.
fn decode_image_stream(stream: &Stream) -> Result<DynamicImage, String> {
    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    if let Ok(img) = image::load_from_memory(&content) {
        return Ok(img);
    }

    let width = int_entry(&stream.dict, b"Width")? as u32;
    let height = int_entry(&stream.dict, b"Height")? as u32;
    let bpc = int_entry(&stream.dict, b"BitsPerComponent").unwrap_or(8);
    if bpc != 8 {
        return Err(format!("Unsupported bits per component: {bpc}"));
    }

    let gray = stream
        .dict
        .get(b"ColorSpace")
        .and_then(Object::as_name)
        .map(|n| n == b"DeviceGray")
        .unwrap_or(false);

    if gray {
        image::GrayImage::from_raw(width, height, content)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| format!("Grayscale buffer does not fit {width}x{height}"))
    } else {
        image::RgbImage::from_raw(width, height, content)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| format!("RGB buffer does not fit {width}x{height}"))
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn resolve_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Result<&'a Dictionary, String> {
    let name = String::from_utf8_lossy(key);
    let obj = dict.get(key).map_err(|_| format!("Missing /{name}"))?;
    resolve(doc, obj)
        .as_dict()
        .map_err(|_| format!("/{name} is not a dictionary"))
}

fn int_entry(dict: &Dictionary, key: &[u8]) -> Result<i64, String> {
    dict.get(key)
        .and_then(Object::as_i64)
        .map_err(|_| format!("Missing integer /{}", String::from_utf8_lossy(key)))
}
