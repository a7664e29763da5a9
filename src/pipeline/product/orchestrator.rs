use crate::config::ExtractorConfig;
use crate::pipeline::extraction::language_detect::detect_language;
use crate::pipeline::extraction::ExtractedTable;
use crate::pipeline::resources;

use super::classify::{boost_for_template, classify_product_type, detect_template};
use super::confidence::finalize;
use super::fields::{ExtractionContext, FieldExtractorFn, FIELD_EXTRACTORS};
use super::normalize::normalize_text;
use super::types::{
    ExtractionMetadata, FieldExtraction, FieldValue, ProductInfoDraft, ProductInfoFinal,
};

/// Turns acquired document text into a thresholded product profile:
/// normalize → classify → field extractors (fork-join) → aggregate.
///
/// Holds only immutable settings; one instance serves any number of
/// documents, including concurrently.
#[derive(Debug, Clone)]
pub struct ProductExtractor {
    confidence_threshold: f32,
    default_currency: String,
}

impl ProductExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            default_currency: config.default_currency.clone(),
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn extract(&self, raw_text: &str, tables: &[ExtractedTable]) -> ProductInfoFinal {
        let normalized = normalize_text(raw_text);
        let template = detect_template(&normalized);
        let language = detect_language(&normalized);

        tracing::info!(
            template = template.as_ref().map(|t| t.name),
            template_confidence = template.as_ref().map_or(0.0, |t| t.score),
            language = %language,
            tables = tables.len(),
            "Document classified"
        );

        let mut draft = ProductInfoDraft {
            metadata: ExtractionMetadata {
                template_type: template.as_ref().map(|t| t.name.to_string()),
                template_confidence: template.as_ref().map_or(0.0, |t| t.score),
                languages: vec![language],
                table_count: tables.len(),
            },
            ..Default::default()
        };

        let ctx = ExtractionContext {
            raw_text,
            normalized: &normalized,
            tables,
            confidence_threshold: self.confidence_threshold,
            default_currency: &self.default_currency,
            tokenizer: resources::sentence_tokenizer(),
        };
        for extraction in run_field_extractors(FIELD_EXTRACTORS, &ctx) {
            draft.record(extraction);
        }

        if let Some((product_type, score)) = classify_product_type(&normalized) {
            let confidence = boost_for_template(product_type, score, template.as_ref());
            draft.record(FieldExtraction::new(FieldValue::Type(product_type), confidence));
        }

        let fields_found = draft.values.len();
        let out = finalize(draft, self.confidence_threshold);
        tracing::info!(
            fields_found,
            fields_kept = out.confidence_scores.values().filter(|&&c| c >= self.confidence_threshold).count(),
            "Product extraction complete"
        );
        out
    }
}

/// Fan the independent extractors out over scoped threads and join them all
/// before returning. Results come back in table order. A panicking
/// extractor is logged and skipped; release builds abort on panic instead.
fn run_field_extractors(
    extractors: &[(&'static str, FieldExtractorFn)],
    ctx: &ExtractionContext<'_>,
) -> Vec<FieldExtraction> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = extractors
            .iter()
            .map(|&(name, extractor)| (name, scope.spawn(move || extractor(ctx))))
            .collect();

        handles
            .into_iter()
            .filter_map(|(name, handle)| match handle.join() {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(field = name, "Field extractor panicked, field skipped");
                    None
                }
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::product::fields::test_support::Fixture;
    use crate::pipeline::product::types::{FieldName, FieldValue, ProductType};
    use std::collections::BTreeMap;

    fn extractor() -> ProductExtractor {
        ProductExtractor::new(&ExtractorConfig::default())
    }

    const CREDIT_CARD_DOC: &str = "CREDIT CARD APPLICATION\n\
        Annual Fee: ₱99.99\n\
        APR 15% - 20%\n\
        Earn rewards points on every purchase with our card benefits.";

    #[test]
    fn credit_card_document() {
        let out = extractor().extract(CREDIT_CARD_DOC, &[]);
        assert_eq!(out.product_type, Some(ProductType::CreditCard));
        assert!(out.confidence_scores[&FieldName::Type] >= 0.7);
        let rate = out.interest_rate.as_ref().unwrap();
        assert_eq!((rate.min, rate.max), (15.0, 20.0));
        assert_eq!(out.metadata.template_type.as_deref(), Some("credit_card"));
    }

    #[test]
    fn three_line_card_application_keeps_rate_but_not_type() {
        let text = "CREDIT CARD APPLICATION\nAnnual Fee: ₱99.99\nAPR 15% - 20%";
        let out = extractor().extract(text, &[]);
        let rate = out.interest_rate.as_ref().unwrap();
        assert_eq!((rate.min, rate.max), (15.0, 20.0));
        // 0.7 * 2/3 + 0.3 * 1/4, boosted by 1.2
        let type_conf = out.confidence_scores[&FieldName::Type];
        assert!((type_conf - 0.65).abs() < 1e-4, "type confidence {type_conf}");
        assert!(out.product_type.is_none());
    }

    fn exploding_extractor(_: &ExtractionContext<'_>) -> Option<FieldExtraction> {
        panic!("extractor bug");
    }

    fn constant_collateral(_: &ExtractionContext<'_>) -> Option<FieldExtraction> {
        Some(FieldExtraction::new(FieldValue::CollateralRequired(false), 0.95))
    }

    #[test]
    fn panicking_extractor_is_skipped() {
        let fixture = Fixture::new("No collateral required.");
        let extractors: &[(&'static str, FieldExtractorFn)] =
            &[("broken", exploding_extractor), ("collateral_required", constant_collateral)];
        let results = run_field_extractors(extractors, &fixture.ctx());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].field(), FieldName::CollateralRequired);
    }

    #[test]
    fn loan_amount_with_and_without_table() {
        let text = "Personal Loan\nLoan amount: ₱5,000 - ₱100,000";
        let out = extractor().extract(text, &[]);
        let amount = out.amount_range.as_ref().unwrap();
        assert_eq!((amount.min, amount.max), (5000.0, 100_000.0));
        assert_eq!(amount.currency, "PHP");
        assert!((out.confidence_scores[&FieldName::AmountRange] - 0.8).abs() < 1e-6);

        let table = ExtractedTable {
            columns: vec!["Loan Amount".into()],
            rows: ["5,000", "100,000"]
                .iter()
                .map(|c| BTreeMap::from([("Loan Amount".to_string(), c.to_string())]))
                .collect(),
        };
        let out = extractor().extract(text, &[table]);
        assert!((out.confidence_scores[&FieldName::AmountRange] - 0.9).abs() < 1e-6);
        assert_eq!(out.metadata.table_count, 1);
    }

    #[test]
    fn tenure_pools_months_and_years() {
        let out = extractor().extract("Flexible terms: 12 months or up to 5 years.", &[]);
        let tenure = out.tenure_range.unwrap();
        assert_eq!((tenure.min, tenure.max), (12, 60));
    }

    #[test]
    fn no_collateral_statement() {
        let out = extractor().extract("Quick cash. No collateral required.", &[]);
        assert_eq!(out.collateral_required, Some(false));
        assert!((out.confidence_scores[&FieldName::CollateralRequired] - 0.95).abs() < 1e-6);
    }

    #[test]
    fn heading_becomes_name() {
        let out = extractor().extract("PREMIUM REWARDS CARD\nAnnual fee waived.", &[]);
        assert_eq!(out.name.as_deref(), Some("PREMIUM REWARDS CARD"));
    }

    #[test]
    fn emitted_fields_meet_threshold() {
        let out = extractor().extract(CREDIT_CARD_DOC, &[]);
        for (field, conf) in &out.confidence_scores {
            assert!((0.0..=1.0).contains(conf));
            if out.has(*field) {
                assert!(*conf >= 0.7, "{} emitted at {conf}", field.as_str());
            }
        }
    }

    #[test]
    fn same_input_same_json() {
        let a = serde_json::to_string(&extractor().extract(CREDIT_CARD_DOC, &[])).unwrap();
        let b = serde_json::to_string(&extractor().extract(CREDIT_CARD_DOC, &[])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn language_recorded_as_single_entry() {
        let out = extractor().extract(CREDIT_CARD_DOC, &[]);
        assert_eq!(out.metadata.languages, vec!["eng"]);
    }

    #[test]
    fn stricter_threshold_hides_more() {
        let config = ExtractorConfig {
            confidence_threshold: 0.99,
            ..Default::default()
        };
        let out = ProductExtractor::new(&config).extract(CREDIT_CARD_DOC, &[]);
        assert!(out.interest_rate.is_none());
        assert!(out.confidence_scores.contains_key(&FieldName::InterestRate));
    }
}
