use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ProductError;

/// Enum with `as_str` + `FromStr`; serde uses the same string.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ProductError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ProductError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ProductType {
    CreditCard => "CreditCard",
    PersonalLoan => "PersonalLoan",
    MicrofinanceLoan => "MicrofinanceLoan",
    SavingsAccount => "SavingsAccount",
});

impl ProductType {
    /// Document template that corresponds to this product type.
    pub fn template_key(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::PersonalLoan => "personal_loan",
            Self::MicrofinanceLoan => "microfinance",
            Self::SavingsAccount => "savings",
        }
    }
}

str_enum!(ComplianceStatus {
    PendingReview => "PendingReview",
    Compliant => "Compliant",
    ViolationsFound => "ViolationsFound",
});

// Declaration order is the key order of `confidence_scores`.
str_enum!(FieldName {
    Name => "name",
    Type => "type",
    Description => "description",
    AmountRange => "amount_range",
    TenureRange => "tenure_range",
    InterestRate => "interest_rate",
    CollateralRequired => "collateral_required",
    TargetSegments => "target_segments",
});

str_enum!(TenureUnit {
    Months => "months",
});

str_enum!(RateType {
    Apr => "APR",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
    /// ISO 4217 code
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenureRange {
    pub min: u32,
    pub max: u32,
    pub unit: TenureUnit,
}

/// Annualized rate range in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestRate {
    pub min: f64,
    pub max: f64,
    #[serde(rename = "type")]
    pub rate_type: RateType,
}

/// One value per field, tagged by the field it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Name(String),
    Type(ProductType),
    Description(String),
    AmountRange(AmountRange),
    TenureRange(TenureRange),
    InterestRate(InterestRate),
    CollateralRequired(bool),
    TargetSegments(Vec<String>),
}

impl FieldValue {
    pub fn field(&self) -> FieldName {
        match self {
            Self::Name(_) => FieldName::Name,
            Self::Type(_) => FieldName::Type,
            Self::Description(_) => FieldName::Description,
            Self::AmountRange(_) => FieldName::AmountRange,
            Self::TenureRange(_) => FieldName::TenureRange,
            Self::InterestRate(_) => FieldName::InterestRate,
            Self::CollateralRequired(_) => FieldName::CollateralRequired,
            Self::TargetSegments(_) => FieldName::TargetSegments,
        }
    }
}

/// Winning candidate of one field extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExtraction {
    pub value: FieldValue,
    pub confidence: f32,
}

impl FieldExtraction {
    pub fn new(value: FieldValue, confidence: f32) -> Self {
        Self { value, confidence }
    }

    pub fn field(&self) -> FieldName {
        self.value.field()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub template_type: Option<String>,
    pub template_confidence: f32,
    pub languages: Vec<String>,
    pub table_count: usize,
}

/// Working state while extractors run. Never leaves the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ProductInfoDraft {
    pub values: BTreeMap<FieldName, FieldValue>,
    pub confidences: BTreeMap<FieldName, f32>,
    pub metadata: ExtractionMetadata,
}

impl ProductInfoDraft {
    /// Record a field. Confidence is clamped into [0, 1].
    pub fn record(&mut self, extraction: FieldExtraction) {
        let field = extraction.field();
        self.confidences
            .insert(field, clamp_confidence(extraction.confidence));
        self.values.insert(field, extraction.value);
    }

    pub fn confidence(&self, field: FieldName) -> Option<f32> {
        self.confidences.get(&field).copied()
    }
}

pub fn clamp_confidence(c: f32) -> f32 {
    if c.is_nan() {
        0.0
    } else {
        c.clamp(0.0, 1.0)
    }
}

/// Thresholded product profile: the only artifact leaving the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfoFinal {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub product_type: Option<ProductType>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub amount_range: Option<AmountRange>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tenure_range: Option<TenureRange>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub interest_rate: Option<InterestRate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub collateral_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_segments: Option<Vec<String>>,
    pub compliance_status: ComplianceStatus,
    pub confidence_scores: BTreeMap<FieldName, f32>,
    pub metadata: ExtractionMetadata,
}

impl ProductInfoFinal {
    pub fn empty(metadata: ExtractionMetadata) -> Self {
        Self {
            name: None,
            product_type: None,
            description: None,
            amount_range: None,
            tenure_range: None,
            interest_rate: None,
            collateral_required: None,
            target_segments: None,
            compliance_status: ComplianceStatus::PendingReview,
            confidence_scores: BTreeMap::new(),
            metadata,
        }
    }

    /// Store a value in its typed slot.
    pub fn set(&mut self, value: FieldValue) {
        match value {
            FieldValue::Name(v) => self.name = Some(v),
            FieldValue::Type(v) => self.product_type = Some(v),
            FieldValue::Description(v) => self.description = Some(v),
            FieldValue::AmountRange(v) => self.amount_range = Some(v),
            FieldValue::TenureRange(v) => self.tenure_range = Some(v),
            FieldValue::InterestRate(v) => self.interest_rate = Some(v),
            FieldValue::CollateralRequired(v) => self.collateral_required = Some(v),
            FieldValue::TargetSegments(v) => self.target_segments = Some(v),
        }
    }

    pub fn has(&self, field: FieldName) -> bool {
        match field {
            FieldName::Name => self.name.is_some(),
            FieldName::Type => self.product_type.is_some(),
            FieldName::Description => self.description.is_some(),
            FieldName::AmountRange => self.amount_range.is_some(),
            FieldName::TenureRange => self.tenure_range.is_some(),
            FieldName::InterestRate => self.interest_rate.is_some(),
            FieldName::CollateralRequired => self.collateral_required.is_some(),
            FieldName::TargetSegments => self.target_segments.is_some(),
        }
    }
}
