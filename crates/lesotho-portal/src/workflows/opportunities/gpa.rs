//! Letter-grade to grade-point conversion backing `Student.gpa`.

use serde::{Deserialize, Serialize};

use super::eligibility::round_gpa;

/// A graded subject from the student's transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectGrade {
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradeError {
    #[error("unknown grade symbol '{0}'")]
    UnknownSymbol(String),
    #[error("subject name must not be empty")]
    MissingName,
}

const GRADE_POINTS: [(&str, f64); 12] = [
    ("A+", 4.0),
    ("A", 4.0),
    ("A-", 3.7),
    ("B+", 3.3),
    ("B", 3.0),
    ("B-", 2.7),
    ("C+", 2.3),
    ("C", 2.0),
    ("C-", 1.7),
    ("D+", 1.3),
    ("D", 1.0),
    ("F", 0.0),
];

pub fn grade_points(symbol: &str) -> Option<f64> {
    let symbol = symbol.trim();
    GRADE_POINTS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(symbol))
        .map(|(_, points)| *points)
}

impl SubjectGrade {
    /// Validates a subject before it is added to a transcript.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Result<Self, GradeError> {
        let name = name.into();
        let symbol = symbol.into();
        if name.trim().is_empty() {
            return Err(GradeError::MissingName);
        }
        if grade_points(&symbol).is_none() {
            return Err(GradeError::UnknownSymbol(symbol));
        }
        Ok(Self {
            name: name.trim().to_string(),
            symbol: symbol.trim().to_ascii_uppercase(),
        })
    }
}

/// Mean grade point over `subjects`, rounded to two decimals. Unknown symbols count as zero
/// and an empty transcript yields 0.0.
pub fn compute_gpa(subjects: &[SubjectGrade]) -> f64 {
    if subjects.is_empty() {
        return 0.0;
    }

    let total: f64 = subjects
        .iter()
        .map(|subject| grade_points(&subject.symbol).unwrap_or(0.0))
        .sum();
    round_gpa(total / subjects.len() as f64)
}
