//! Reference tables: score descriptors and the rating catalogue.
//!
//! Sub-score domains are derived once from [`SCORE_DESCRIPTORS`] rather than
//! written out per check. [`rating_catalogue`] lists every scheme and rating
//! combination validation accepts, with a rating key that matches it.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::types::{FhisValue, RatingLocale};

/// Sub-score category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreCategory {
    /// Food hygiene and safety.
    Hygiene,
    /// Structure and cleanliness of the premises.
    Structural,
    /// Confidence in management.
    ConfidenceInManagement,
}

impl ScoreCategory {
    /// Field name used in raw records.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Hygiene => "Hygiene",
            Self::Structural => "Structural",
            Self::ConfidenceInManagement => "ConfidenceInManagement",
        }
    }
}

/// One row of the score descriptor table.
#[derive(Debug, Clone, Copy)]
pub struct ScoreDescriptor {
    /// Category the row belongs to.
    pub category: ScoreCategory,
    /// Score value.
    pub score: u8,
    /// Published description of the score.
    pub description: &'static str,
}

const fn row(category: ScoreCategory, score: u8, description: &'static str) -> ScoreDescriptor {
    ScoreDescriptor {
        category,
        score,
        description,
    }
}

/// The published score descriptor table.
pub const SCORE_DESCRIPTORS: &[ScoreDescriptor] = &[
    row(ScoreCategory::Hygiene, 0, "Very good"),
    row(ScoreCategory::Hygiene, 5, "Good"),
    row(ScoreCategory::Hygiene, 10, "Generally satisfactory"),
    row(ScoreCategory::Hygiene, 15, "Improvement necessary"),
    row(ScoreCategory::Hygiene, 20, "Major improvement necessary"),
    row(ScoreCategory::Hygiene, 25, "Urgent improvement necessary"),
    row(ScoreCategory::Structural, 0, "Very good"),
    row(ScoreCategory::Structural, 5, "Good"),
    row(ScoreCategory::Structural, 10, "Generally satisfactory"),
    row(ScoreCategory::Structural, 15, "Improvement necessary"),
    row(ScoreCategory::Structural, 20, "Major improvement necessary"),
    row(ScoreCategory::Structural, 25, "Urgent improvement necessary"),
    row(ScoreCategory::ConfidenceInManagement, 0, "Very good"),
    row(ScoreCategory::ConfidenceInManagement, 5, "Good"),
    row(ScoreCategory::ConfidenceInManagement, 10, "Generally satisfactory"),
    row(ScoreCategory::ConfidenceInManagement, 20, "Major improvement necessary"),
    row(ScoreCategory::ConfidenceInManagement, 30, "Urgent improvement necessary"),
];

/// Allowed values per sub-score category.
#[derive(Debug, Clone, Default)]
pub struct ScoreDomains {
    hygiene: BTreeSet<u8>,
    structural: BTreeSet<u8>,
    confidence_in_management: BTreeSet<u8>,
}

impl ScoreDomains {
    /// Collect the domains from descriptor rows.
    #[must_use]
    pub fn from_descriptors(rows: &[ScoreDescriptor]) -> Self {
        let mut domains = Self::default();
        for descriptor in rows {
            domains.domain_mut(descriptor.category).insert(descriptor.score);
        }
        domains
    }

    /// Allowed values of one category.
    #[must_use]
    pub const fn domain(&self, category: ScoreCategory) -> &BTreeSet<u8> {
        match category {
            ScoreCategory::Hygiene => &self.hygiene,
            ScoreCategory::Structural => &self.structural,
            ScoreCategory::ConfidenceInManagement => &self.confidence_in_management,
        }
    }

    fn domain_mut(&mut self, category: ScoreCategory) -> &mut BTreeSet<u8> {
        match category {
            ScoreCategory::Hygiene => &mut self.hygiene,
            ScoreCategory::Structural => &mut self.structural,
            ScoreCategory::ConfidenceInManagement => &mut self.confidence_in_management,
        }
    }

    /// Whether `value` is an allowed score for `category`.
    #[must_use]
    pub fn contains(&self, category: ScoreCategory, value: i64) -> bool {
        u8::try_from(value).is_ok_and(|v| self.domain(category).contains(&v))
    }
}

/// Domains derived from [`SCORE_DESCRIPTORS`], built on first use.
pub static SCORE_DOMAINS: LazyLock<ScoreDomains> =
    LazyLock::new(|| ScoreDomains::from_descriptors(SCORE_DESCRIPTORS));

/// FHRS rating values that stand for "no grade".
pub const FHRS_SPECIAL_CODES: [&str; 3] = ["AwaitingInspection", "AwaitingPublication", "Exempt"];

/// Highest FHRS grade.
pub const FHRS_MAX_GRADE: u8 = 5;

/// Rating key for an FHRS grade in a locale, e.g. `fhrs_5_en-GB`.
#[must_use]
pub fn fhrs_rating_key(grade: u8, locale: RatingLocale) -> String {
    format!("fhrs_{grade}_{}", locale.tag())
}

/// One accepted scheme and rating combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingCase {
    /// Scheme tag.
    pub scheme: &'static str,
    /// Rating value as written upstream.
    pub value: String,
    /// A rating key that goes with the value.
    pub key: String,
    /// Whether the combination may carry sub-scores.
    pub allows_scores: bool,
}

/// Every scheme and rating combination validation accepts.
#[must_use]
pub fn rating_catalogue() -> Vec<RatingCase> {
    let mut cases = Vec::new();

    for grade in 0..=FHRS_MAX_GRADE {
        for locale in RatingLocale::ALL {
            cases.push(RatingCase {
                scheme: "FHRS",
                value: grade.to_string(),
                key: fhrs_rating_key(grade, locale),
                allows_scores: true,
            });
        }
    }

    for code in FHRS_SPECIAL_CODES {
        cases.push(RatingCase {
            scheme: "FHRS",
            value: code.to_string(),
            key: format!("fhrs_{}_en-GB", code.to_ascii_lowercase()),
            allows_scores: false,
        });
    }

    for value in FhisValue::ALL {
        cases.push(RatingCase {
            scheme: "FHIS",
            value: value.as_str().to_string(),
            key: value.rating_key().to_string(),
            allows_scores: false,
        });
    }

    cases
}
