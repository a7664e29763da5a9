//! Document template and product type classification.
//!
//! Both classifiers score every candidate and keep the strictly highest,
//! so ties go to the candidate declared first. A zero score yields `None`.

use std::sync::LazyLock;

use regex::Regex;

use super::types::ProductType;

struct Template {
    name: &'static str,
    patterns: Vec<Regex>,
}

fn template(name: &'static str, patterns: &[&str]) -> Template {
    Template {
        name,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
            .collect(),
    }
}

static TEMPLATES: LazyLock<Vec<Template>> = LazyLock::new(|| {
    vec![
        template(
            "credit_card",
            &[r"credit\s+card\s+application", r"card\s+benefits", r"annual\s+fee", r"rewards\s+program"],
        ),
        template(
            "personal_loan",
            &[r"loan\s+application", r"interest\s+rate", r"loan\s+term", r"collateral"],
        ),
        template(
            "microfinance",
            &[r"group\s+lending", r"micro\s+loan", r"weekly\s+payment", r"financial\s+literacy"],
        ),
        template(
            "savings",
            &[r"savings\s+account", r"interest\s+rate", r"minimum\s+balance", r"atm\s+card"],
        ),
    ]
});

struct TypeKeywords {
    product_type: ProductType,
    primary: &'static [&'static str],
    secondary: &'static [&'static str],
}

const TYPE_KEYWORDS: &[TypeKeywords] = &[
    TypeKeywords {
        product_type: ProductType::CreditCard,
        primary: &["credit card", "creditcard", "card application"],
        secondary: &["annual fee", "rewards", "cash back", "points"],
    },
    TypeKeywords {
        product_type: ProductType::PersonalLoan,
        primary: &["personal loan", "unsecured loan", "term loan"],
        secondary: &["loan application", "collateral", "loan purpose"],
    },
    TypeKeywords {
        product_type: ProductType::MicrofinanceLoan,
        primary: &["microfinance", "micro loan", "group loan"],
        secondary: &["group lending", "weekly payment", "financial literacy"],
    },
    TypeKeywords {
        product_type: ProductType::SavingsAccount,
        primary: &["savings account", "deposit account", "savings deposit"],
        secondary: &["minimum balance", "interest rate", "atm card"],
    },
];

const PRIMARY_WEIGHT: f32 = 0.7;
const SECONDARY_WEIGHT: f32 = 0.3;
const TEMPLATE_AGREEMENT_BOOST: f32 = 1.2;

pub(super) fn warm_up() -> usize {
    TEMPLATES.iter().map(|t| t.patterns.len()).sum()
}

/// Best matching document template and its score (matched / total patterns).
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMatch {
    pub name: &'static str,
    pub score: f32,
}

pub fn detect_template(text: &str) -> Option<TemplateMatch> {
    let mut best: Option<TemplateMatch> = None;
    let mut best_score = 0.0_f32;

    for t in TEMPLATES.iter() {
        let matched = t.patterns.iter().filter(|p| p.is_match(text)).count();
        let score = matched as f32 / t.patterns.len() as f32;
        if score > best_score {
            best_score = score;
            best = Some(TemplateMatch {
                name: t.name,
                score,
            });
        }
    }
    best
}

/// Product type by weighted keyword presence, before any template boost.
pub fn classify_product_type(text: &str) -> Option<(ProductType, f32)> {
    let lower = text.to_lowercase();
    let mut best = None;
    let mut best_score = 0.0_f32;

    for kw in TYPE_KEYWORDS {
        let score = PRIMARY_WEIGHT * hit_ratio(&lower, kw.primary)
            + SECONDARY_WEIGHT * hit_ratio(&lower, kw.secondary);
        if score > best_score {
            best_score = score;
            best = Some((kw.product_type, score));
        }
    }
    best
}

fn hit_ratio(text: &str, terms: &[&str]) -> f32 {
    let hits = terms.iter().filter(|t| text.contains(*t)).count();
    hits as f32 / terms.len() as f32
}

/// Type confidence after agreement with the detected template.
pub fn boost_for_template(product_type: ProductType, confidence: f32, template: Option<&TemplateMatch>) -> f32 {
    match template {
        Some(t) if t.name == product_type.template_key() => {
            (confidence * TEMPLATE_AGREEMENT_BOOST).min(1.0)
        }
        _ => confidence,
    }
}
