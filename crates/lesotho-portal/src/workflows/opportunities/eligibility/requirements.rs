use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Document;

/// Posting requirements with explicit optional semantics. `None` or an empty list means the
/// posting places no constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingRequirements {
    pub min_gpa: Option<f64>,
    /// Trimmed requirement fragments in their original spelling.
    pub required_certificates: Vec<String>,
    pub required_experience: Option<u32>,
}

impl PostingRequirements {
    /// Reads `minGPA`, `requiredCertificates` and `requiredExperience` from a posting document.
    /// Malformed values are treated as unset.
    pub fn from_document(document: &Document) -> Self {
        Self {
            min_gpa: document.get("minGPA").and_then(parse_threshold),
            required_certificates: document
                .get("requiredCertificates")
                .map(parse_certificate_list)
                .unwrap_or_default(),
            required_experience: document.get("requiredExperience").and_then(parse_years),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.min_gpa.is_none()
            && self.required_certificates.is_empty()
            && self.required_experience.is_none()
    }
}

/// Rounds to the two decimals GPAs are stored with.
pub(crate) fn round_gpa(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Numeric value from a number or a numeric string.
pub(crate) fn lenient_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn parse_threshold(value: &Value) -> Option<f64> {
    lenient_number(value)
        .filter(|threshold| *threshold > 0.0)
        .map(round_gpa)
}

fn parse_years(value: &Value) -> Option<u32> {
    let years = lenient_number(value)?;
    if years <= 0.0 || years.fract() != 0.0 || years > f64::from(u32::MAX) {
        return None;
    }
    Some(years as u32)
}

/// Splits a comma separated requirement string (or an array of strings) into trimmed,
/// non-empty fragments.
pub(crate) fn parse_certificate_list(value: &Value) -> Vec<String> {
    let fragments: Vec<&str> = match value {
        Value::String(raw) => raw.split(',').collect(),
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    fragments
        .into_iter()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect()
}
