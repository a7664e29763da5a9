use std::collections::HashMap;

use super::types::{OcrEngine, OcrPageResult};
use super::ExtractionError;

/// Bundled Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: std::path::PathBuf,
    /// Requested languages that have a traineddata file on disk.
    installed: Vec<String>,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// Initialize against a tessdata directory. At least one of the requested
    /// languages must be installed there.
    pub fn new(tessdata_dir: &std::path::Path, languages: &[String]) -> Result<Self, ExtractionError> {
        let installed: Vec<String> = languages
            .iter()
            .filter(|lang| tessdata_dir.join(format!("{lang}.traineddata")).exists())
            .cloned()
            .collect();

        if installed.is_empty() {
            return Err(ExtractionError::TessdataNotFound(tessdata_dir.to_path_buf()));
        }

        let missing: Vec<&String> = languages.iter().filter(|l| !installed.contains(l)).collect();
        if !missing.is_empty() {
            tracing::warn!(
                tessdata = %tessdata_dir.display(),
                missing = ?missing,
                "Some OCR languages have no traineddata, skipping them"
            );
        }

        Ok(Self {
            tessdata_dir: tessdata_dir.to_path_buf(),
            installed,
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image_with_lang(
        &self,
        image_bytes: &[u8],
        lang: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        let tessdata_str = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?;

        let tess = tesseract::Tesseract::new(Some(tessdata_str), Some(lang))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let confidence = tess.mean_text_conf().max(0) as f32 / 100.0;

        Ok(OcrPageResult { text, confidence })
    }

    fn available_languages(&self) -> Option<Vec<String>> {
        Some(self.installed.clone())
    }
}

/// Mock OCR engine for unit testing without Tesseract.
///
/// Returns `text` for every language unless a per-language override is
/// registered. Languages listed in `failing` return an OCR error.
pub struct MockOcrEngine {
    pub text: String,
    pub confidence: f32,
    by_language: HashMap<String, String>,
    failing: Vec<String>,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            by_language: HashMap::new(),
            failing: Vec::new(),
        }
    }

    /// Respond with `text` when asked for `lang`.
    pub fn with_language(mut self, lang: &str, text: &str) -> Self {
        self.by_language.insert(lang.to_string(), text.to_string());
        self
    }

    /// Fail every call for `lang`.
    pub fn failing_for(mut self, lang: &str) -> Self {
        self.failing.push(lang.to_string());
        self
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image_with_lang(
        &self,
        _image_bytes: &[u8],
        lang: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        if self.failing.iter().any(|l| l == lang) {
            return Err(ExtractionError::OcrProcessing(format!(
                "mock failure for language {lang}"
            )));
        }
        let text = self
            .by_language
            .get(lang)
            .cloned()
            .unwrap_or_else(|| self.text.clone());
        Ok(OcrPageResult {
            text,
            confidence: self.confidence,
        })
    }
}
