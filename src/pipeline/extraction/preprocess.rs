//! Image preparation for the OCR tier.
//!
//! Rendered pages arrive as PNG in whatever color mode the renderer chose.
//! Tesseract does best on single-channel input, so everything is flattened
//! to 8-bit grayscale before recognition.

use image::{DynamicImage, GenericImageView, ImageOutputFormat};

use super::ExtractionError;

/// Smallest side we will hand to OCR. Anything below is a broken render.
const MIN_DIMENSION_PX: u32 = 16;

/// Decode, convert to 8-bit grayscale, re-encode as PNG.
pub fn to_grayscale_png(image_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    let img = validate_image_bytes(image_bytes)?;
    let gray = DynamicImage::ImageLuma8(img.to_luma8());

    let mut out = Vec::new();
    gray.write_to(&mut out, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;

    tracing::debug!(
        width = gray.width(),
        height = gray.height(),
        png_size = out.len(),
        "Converted page image to grayscale"
    );
    Ok(out)
}

/// Decode image bytes and reject degenerate renders.
pub fn validate_image_bytes(image_bytes: &[u8]) -> Result<DynamicImage, ExtractionError> {
    if image_bytes.is_empty() {
        return Err(ExtractionError::ImageProcessing("Empty image buffer".into()));
    }
    let img = image::load_from_memory(image_bytes)
        .map_err(|e| ExtractionError::ImageProcessing(format!("Failed to decode image: {e}")))?;

    let (w, h) = img.dimensions();
    if w < MIN_DIMENSION_PX || h < MIN_DIMENSION_PX {
        return Err(ExtractionError::ImageProcessing(format!(
            "Image too small for OCR: {w}x{h}"
        )));
    }
    Ok(img)
}
