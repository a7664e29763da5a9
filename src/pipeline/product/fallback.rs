//! Language-model fallback for fields the heuristics could not settle.
//!
//! The processor only consults a fallback when `name` or `type` is missing.
//! Heuristic values always win; the fallback fills gaps.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{
    AmountRange, FieldName, FieldValue, InterestRate, ProductInfoFinal, ProductType, RateType,
    TenureRange, TenureUnit,
};
use crate::config::{LlmFallbackConfig, DEFAULT_CURRENCY};

/// Characters of document text sent to the model.
const MAX_PROMPT_CHARS: usize = 20_000;

const SYSTEM_PROMPT: &str = "You extract financial product information from PDF text. \
Return strict JSON with keys: name (string), type (one of CreditCard|PersonalLoan|MicrofinanceLoan|SavingsAccount or null), \
description (string|null), amount_range ({min,max,currency}|null), tenure_range ({min,max,unit}|null), \
interest_rate ({min,max,type}|null), collateral_required (true|false|null), target_segments (string[]|null), \
compliance_status (PendingReview|Compliant|ViolationsFound|null). Only JSON in response.";

const USER_PREAMBLE: &str =
    "Extract fields from the following text. If uncertain, return null for the field.\n\nTEXT:\n";

#[derive(Error, Debug)]
pub enum FallbackError {
    #[error("Language-model fallback is not configured")]
    NotConfigured,

    #[error("Language-model endpoint unreachable at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Language-model endpoint returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed language-model response: {0}")]
    MalformedResponse(String),
}

/// Loosely-typed range as a model returns it. Every key may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FallbackRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl FallbackRange {
    /// Both bounds present, non-negative and ordered.
    fn bounds(&self) -> Option<(f64, f64)> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if 0.0 <= min && min <= max => Some((min, max)),
            _ => None,
        }
    }
}

/// Fields proposed by a fallback extractor. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FallbackProduct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub product_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount_range: Option<FallbackRange>,
    #[serde(default)]
    pub tenure_range: Option<FallbackRange>,
    #[serde(default)]
    pub interest_rate: Option<FallbackRange>,
    #[serde(default)]
    pub collateral_required: Option<bool>,
    #[serde(default)]
    pub target_segments: Option<Vec<String>>,
}

impl FallbackProduct {
    /// Typed values for every usable proposal.
    fn into_values(self) -> Vec<FieldValue> {
        let mut values = Vec::new();

        if let Some(name) = self.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            values.push(FieldValue::Name(name));
        }
        if let Some(raw) = self.product_type {
            match raw.trim().parse::<ProductType>() {
                Ok(t) => values.push(FieldValue::Type(t)),
                Err(e) => tracing::warn!(error = %e, "Ignoring fallback product type"),
            }
        }
        if let Some(d) = self.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()) {
            values.push(FieldValue::Description(d));
        }
        if let Some(range) = self.amount_range {
            if let Some((min, max)) = range.bounds() {
                let currency = range
                    .currency
                    .map(|c| c.trim().to_uppercase())
                    .filter(|c| c.len() == 3)
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
                values.push(FieldValue::AmountRange(AmountRange { min, max, currency }));
            }
        }
        if let Some(range) = self.tenure_range {
            if let Some((min, max)) = range.bounds() {
                let per = months_per_unit(range.unit.as_deref());
                values.push(FieldValue::TenureRange(TenureRange {
                    min: (min * per).round() as u32,
                    max: (max * per).round() as u32,
                    unit: TenureUnit::Months,
                }));
            }
        }
        if let Some(range) = self.interest_rate {
            let monthly = range.kind.as_deref().is_some_and(|k| k.to_lowercase().contains("month"));
            if let Some((min, max)) = range.bounds() {
                let (min, max) = if monthly { (min * 12.0, max * 12.0) } else { (min, max) };
                if max <= 100.0 {
                    values.push(FieldValue::InterestRate(InterestRate {
                        min,
                        max,
                        rate_type: RateType::Apr,
                    }));
                }
            }
        }
        if let Some(required) = self.collateral_required {
            values.push(FieldValue::CollateralRequired(required));
        }
        if let Some(segments) = self.target_segments.filter(|s| !s.is_empty()) {
            values.push(FieldValue::TargetSegments(segments));
        }
        values
    }
}

fn months_per_unit(unit: Option<&str>) -> f64 {
    match unit.map(|u| u.trim().to_lowercase()) {
        Some(u) if u.starts_with("year") || u.starts_with("yr") => 12.0,
        Some(u) if u.starts_with("week") || u.starts_with("wk") => 12.0 / 52.0,
        _ => 1.0,
    }
}

/// Fill the fields the heuristics left empty.
///
/// Filled fields are scored at `confidence`, which the caller sets to the
/// output threshold. Returns the fields that were filled.
pub fn merge_fallback(
    out: &mut ProductInfoFinal,
    fallback: FallbackProduct,
    confidence: f32,
) -> Vec<FieldName> {
    let mut filled = Vec::new();
    for value in fallback.into_values() {
        let field = value.field();
        if out.has(field) {
            continue;
        }
        out.set(value);
        out.confidence_scores.insert(field, confidence);
        filled.push(field);
    }
    filled
}

/// Something that proposes product fields from raw document text.
pub trait ProductFallback {
    fn extract(&self, raw_text: &str) -> Result<FallbackProduct, FallbackError>;
}

/// OpenAI-compatible chat-completions client (OpenAI, Ollama, vLLM, ...).
pub struct OpenAiCompatibleExtractor {
    config: LlmFallbackConfig,
    client: reqwest::blocking::Client,
}

impl OpenAiCompatibleExtractor {
    pub fn new(config: LlmFallbackConfig) -> Result<Self, FallbackError> {
        if !config.is_configured() {
            return Err(FallbackError::NotConfigured);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FallbackError::HttpClient(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self, FallbackError> {
        Self::new(LlmFallbackConfig::from_env())
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ProductFallback for OpenAiCompatibleExtractor {
    fn extract(&self, raw_text: &str) -> Result<FallbackProduct, FallbackError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let excerpt: String = raw_text.chars().take(MAX_PROMPT_CHARS).collect();
        let user = format!("{USER_PREAMBLE}{excerpt}");
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.1,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_connect() {
                FallbackError::Connection(self.config.base_url.clone())
            } else if e.is_timeout() {
                FallbackError::HttpClient(format!(
                    "Request timed out after {}s",
                    self.config.timeout_secs
                ))
            } else {
                FallbackError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FallbackError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| FallbackError::MalformedResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| FallbackError::MalformedResponse("no message content".into()))?;

        parse_fallback_json(&content)
    }
}

/// Parse model output as JSON, recovering the outermost `{...}` when the
/// model wrapped it in prose or code fences.
pub fn parse_fallback_json(content: &str) -> Result<FallbackProduct, FallbackError> {
    match serde_json::from_str(content) {
        Ok(product) => Ok(product),
        Err(first) => {
            let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) else {
                return Err(FallbackError::MalformedResponse(first.to_string()));
            };
            if end < start {
                return Err(FallbackError::MalformedResponse(first.to_string()));
            }
            serde_json::from_str(&content[start..=end])
                .map_err(|e| FallbackError::MalformedResponse(e.to_string()))
        }
    }
}

/// Mock fallback for testing; returns a fixed proposal and counts calls.
pub struct MockFallback {
    product: Option<FallbackProduct>,
    calls: AtomicUsize,
}

impl MockFallback {
    pub fn new(product: FallbackProduct) -> Self {
        Self {
            product: Some(product),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            product: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProductFallback for MockFallback {
    fn extract(&self, _raw_text: &str) -> Result<FallbackProduct, FallbackError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.product
            .clone()
            .ok_or_else(|| FallbackError::Connection("mock".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::product::types::ExtractionMetadata;

    #[test]
    fn parses_strict_json() {
        let p = parse_fallback_json(
            r#"{"name":"Gold Card","type":"CreditCard","interest_rate":{"min":15,"max":20,"type":"APR"}}"#,
        )
        .unwrap();
        assert_eq!(p.name.as_deref(), Some("Gold Card"));
        assert_eq!(p.product_type.as_deref(), Some("CreditCard"));
        assert_eq!(p.interest_rate.unwrap().bounds(), Some((15.0, 20.0)));
    }

    #[test]
    fn recovers_json_wrapped_in_prose() {
        let p = parse_fallback_json("Sure! ```json\n{\"name\": \"Flexi Loan\", \"extra\": 1}\n``` Done.").unwrap();
        assert_eq!(p.name.as_deref(), Some("Flexi Loan"));
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_fallback_json("I cannot help with that."),
            Err(FallbackError::MalformedResponse(_))
        ));
        assert!(parse_fallback_json("} backwards {").is_err());
    }

    #[test]
    fn nulls_are_absent() {
        let p = parse_fallback_json(r#"{"name":null,"type":null,"target_segments":null}"#).unwrap();
        assert_eq!(p, FallbackProduct::default());
    }

    #[test]
    fn merge_fills_only_missing_fields() {
        let mut out = ProductInfoFinal::empty(ExtractionMetadata::default());
        out.set(FieldValue::Name("PREMIUM REWARDS CARD".into()));
        out.confidence_scores.insert(FieldName::Name, 1.0);

        let fallback = FallbackProduct {
            name: Some("Something Else".into()),
            product_type: Some("CreditCard".into()),
            collateral_required: Some(false),
            ..Default::default()
        };
        let filled = merge_fallback(&mut out, fallback, 0.7);

        assert_eq!(filled, vec![FieldName::Type, FieldName::CollateralRequired]);
        assert_eq!(out.name.as_deref(), Some("PREMIUM REWARDS CARD"));
        assert_eq!(out.confidence_scores[&FieldName::Name], 1.0);
        assert_eq!(out.product_type, Some(ProductType::CreditCard));
        assert_eq!(out.confidence_scores[&FieldName::Type], 0.7);
    }

    #[test]
    fn unknown_type_and_bad_ranges_dropped() {
        let fallback = FallbackProduct {
            product_type: Some("Mortgage".into()),
            amount_range: Some(FallbackRange {
                min: Some(500.0),
                max: Some(100.0),
                ..Default::default()
            }),
            interest_rate: Some(FallbackRange {
                min: Some(1.0),
                max: None,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(fallback.into_values().is_empty());
    }

    #[test]
    fn ranges_normalized_to_canonical_units() {
        let fallback = FallbackProduct {
            amount_range: Some(FallbackRange {
                min: Some(1000.0),
                max: Some(5000.0),
                ..Default::default()
            }),
            tenure_range: Some(FallbackRange {
                min: Some(1.0),
                max: Some(3.0),
                unit: Some("years".into()),
                ..Default::default()
            }),
            interest_rate: Some(FallbackRange {
                min: Some(1.0),
                max: Some(2.0),
                kind: Some("monthly".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let values = fallback.into_values();
        assert_eq!(
            values,
            vec![
                FieldValue::AmountRange(AmountRange {
                    min: 1000.0,
                    max: 5000.0,
                    currency: "PHP".into()
                }),
                FieldValue::TenureRange(TenureRange {
                    min: 12,
                    max: 36,
                    unit: TenureUnit::Months
                }),
                FieldValue::InterestRate(InterestRate {
                    min: 12.0,
                    max: 24.0,
                    rate_type: RateType::Apr
                }),
            ]
        );
    }

    #[test]
    fn unconfigured_client_refused() {
        let config = LlmFallbackConfig::default();
        assert!(matches!(
            OpenAiCompatibleExtractor::new(config),
            Err(FallbackError::NotConfigured)
        ));
    }

    #[test]
    fn unreachable_endpoint_is_connection_error() {
        let config = LlmFallbackConfig {
            base_url: "http://localhost:1".into(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = OpenAiCompatibleExtractor::new(config).unwrap();
        let err = client.extract("Gold Card").unwrap_err();
        assert!(matches!(err, FallbackError::Connection(_) | FallbackError::HttpClient(_)));
    }

    #[test]
    fn mock_counts_calls() {
        let mock = MockFallback::failing();
        assert!(mock.extract("x").is_err());
        assert!(mock.extract("x").is_err());
        assert_eq!(mock.calls(), 2);
    }
}
