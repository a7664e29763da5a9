use std::path::PathBuf;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "Finprod";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum confidence a field needs to appear in the final product profile.
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Currency assumed when an amount range carries no symbol.
pub const DEFAULT_CURRENCY: &str = "PHP";

/// OCR languages, tried in order per page (English, then Filipino).
pub const DEFAULT_OCR_LANGUAGES: &[&str] = &["eng", "fil"];

/// Rasterization DPI for the OCR tier.
pub const DEFAULT_RENDER_DPI: u32 = 300;

/// OpenAI-compatible endpoint used when no base URL is configured.
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=info", env!("CARGO_CRATE_NAME"))
}

/// Runtime configuration for the extraction pipeline.
///
/// Defaults mirror the constants above. `from_env()` layers environment
/// overrides on top; unparsable values are logged and ignored.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractorConfig {
    pub confidence_threshold: f32,
    pub default_currency: String,
    pub ocr_languages: Vec<String>,
    pub render_dpi: u32,
    /// Explicit tessdata directory (`TESSDATA_PREFIX`).
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: CONFIDENCE_THRESHOLD,
            default_currency: DEFAULT_CURRENCY.to_string(),
            ocr_languages: DEFAULT_OCR_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            render_dpi: DEFAULT_RENDER_DPI,
            tessdata_dir: None,
        }
    }
}

impl ExtractorConfig {
    /// Defaults overridden by `FINPROD_*` / `TESSDATA_PREFIX` variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("FINPROD_CONFIDENCE_THRESHOLD") {
            match raw.trim().parse::<f32>() {
                Ok(v) if (0.0..=1.0).contains(&v) => config.confidence_threshold = v,
                _ => tracing::warn!(value = %raw, "Ignoring invalid FINPROD_CONFIDENCE_THRESHOLD"),
            }
        }

        if let Some(raw) = lookup("FINPROD_DEFAULT_CURRENCY") {
            let code = raw.trim().to_uppercase();
            if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
                config.default_currency = code;
            } else {
                tracing::warn!(value = %raw, "Ignoring invalid FINPROD_DEFAULT_CURRENCY");
            }
        }

        if let Some(raw) = lookup("FINPROD_OCR_LANGUAGES") {
            let langs: Vec<String> = raw
                .split(|c| c == ',' || c == '+')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            if !langs.is_empty() {
                config.ocr_languages = langs;
            }
        }

        if let Some(raw) = lookup("FINPROD_RENDER_DPI") {
            match raw.trim().parse::<u32>() {
                Ok(v) if (72..=600).contains(&v) => config.render_dpi = v,
                _ => tracing::warn!(value = %raw, "Ignoring invalid FINPROD_RENDER_DPI"),
            }
        }

        config.tessdata_dir = lookup("TESSDATA_PREFIX")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        config
    }
}

/// Settings for the language-model fallback extractor (`OPENAI_*`).
#[derive(Debug, Clone, Serialize)]
pub struct LlmFallbackConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmFallbackConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

impl LlmFallbackConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        config.api_key = non_empty("OPENAI_API_KEY").map(|k| k.trim().to_string());
        if let Some(model) = non_empty("OPENAI_MODEL") {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = non_empty("LLM_TIMEOUT") {
            match raw.trim().parse::<u64>() {
                Ok(v) if v > 0 => config.timeout_secs = v,
                _ => tracing::warn!(value = %raw, "Ignoring invalid LLM_TIMEOUT"),
            }
        }
        config
    }

    /// Local servers (Ollama, anything on localhost) need no key.
    pub fn is_configured(&self) -> bool {
        self.base_url.contains("ollama") || self.base_url.contains("localhost") || self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_name_is_finprod() {
        assert_eq!(APP_NAME, "Finprod");
    }

    #[test]
    fn defaults_match_constants() {
        let config = ExtractorConfig::default();
        assert!((config.confidence_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.default_currency, "PHP");
        assert_eq!(config.ocr_languages, vec!["eng", "fil"]);
        assert_eq!(config.render_dpi, 300);
        assert!(config.tessdata_dir.is_none());
    }

    #[test]
    fn env_overrides_applied() {
        let config = ExtractorConfig::from_lookup(lookup_from(&[
            ("FINPROD_CONFIDENCE_THRESHOLD", "0.8"),
            ("FINPROD_DEFAULT_CURRENCY", "usd"),
            ("FINPROD_OCR_LANGUAGES", "eng+tgl"),
            ("FINPROD_RENDER_DPI", "200"),
            ("TESSDATA_PREFIX", "/opt/tessdata"),
        ]));
        assert!((config.confidence_threshold - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.default_currency, "USD");
        assert_eq!(config.ocr_languages, vec!["eng", "tgl"]);
        assert_eq!(config.render_dpi, 200);
        assert_eq!(config.tessdata_dir, Some(PathBuf::from("/opt/tessdata")));
    }

    #[test]
    fn invalid_overrides_keep_defaults() {
        let config = ExtractorConfig::from_lookup(lookup_from(&[
            ("FINPROD_CONFIDENCE_THRESHOLD", "1.5"),
            ("FINPROD_DEFAULT_CURRENCY", "pesos"),
            ("FINPROD_OCR_LANGUAGES", " , "),
            ("FINPROD_RENDER_DPI", "abc"),
            ("TESSDATA_PREFIX", "  "),
        ]));
        assert!((config.confidence_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.default_currency, "PHP");
        assert_eq!(config.ocr_languages, vec!["eng", "fil"]);
        assert_eq!(config.render_dpi, 300);
        assert!(config.tessdata_dir.is_none());
    }

    #[test]
    fn llm_defaults_unconfigured() {
        let config = LlmFallbackConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.is_configured());
    }

    #[test]
    fn llm_key_or_local_url_configures() {
        let keyed = LlmFallbackConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")]));
        assert!(keyed.is_configured());

        let local = LlmFallbackConfig::from_lookup(lookup_from(&[
            ("OPENAI_BASE_URL", "http://localhost:11434/v1/"),
            ("LLM_TIMEOUT", "zero"),
        ]));
        assert!(local.is_configured());
        assert_eq!(local.base_url, "http://localhost:11434/v1");
        assert_eq!(local.timeout_secs, 30);
    }

    #[test]
    fn llm_api_key_never_serialized() {
        let config = LlmFallbackConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-secret")]));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
