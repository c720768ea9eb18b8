mod requirements;
mod rules;

pub use requirements::PostingRequirements;

pub(crate) use requirements::{lenient_number, parse_certificate_list, round_gpa};

use serde::{Deserialize, Serialize};

use super::domain::{Posting, StudentProfile};

/// One of the three conjunctive checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EligibilityCheck {
    Gpa,
    Certificates,
    Experience,
}

impl EligibilityCheck {
    pub const fn label(self) -> &'static str {
        match self {
            EligibilityCheck::Gpa => "gpa",
            EligibilityCheck::Certificates => "certificates",
            EligibilityCheck::Experience => "experience",
        }
    }

    /// Badge text surfaced next to a disabled Apply action.
    pub fn badge(self, requirements: &PostingRequirements) -> String {
        match self {
            EligibilityCheck::Gpa => match requirements.min_gpa {
                Some(min_gpa) => format!("Requires GPA {min_gpa:.2}"),
                None => "Requires GPA".to_string(),
            },
            EligibilityCheck::Certificates => format!(
                "Requires certificates: {}",
                requirements.required_certificates.join(", ")
            ),
            EligibilityCheck::Experience => {
                let years = requirements.required_experience.unwrap_or_default();
                if years == 1 {
                    "Requires 1 year of experience".to_string()
                } else {
                    format!("Requires {years} years of experience")
                }
            }
        }
    }
}

/// Qualification verdict plus the unmet criteria, in check order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityVerdict {
    pub is_qualified: bool,
    pub failed_checks: Vec<EligibilityCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<String>,
}

impl EligibilityVerdict {
    pub fn failed_labels(&self) -> Vec<&'static str> {
        self.failed_checks
            .iter()
            .map(|check| check.label())
            .collect()
    }

    pub fn failed(&self, check: EligibilityCheck) -> bool {
        self.failed_checks.contains(&check)
    }
}

/// Decides whether `student` meets `posting`'s requirements. Never fails; eligibility only
/// gates the Apply action and never hides a posting.
pub fn evaluate_eligibility(student: &StudentProfile, posting: &Posting) -> EligibilityVerdict {
    evaluate_requirements(student, &posting.requirements)
}

pub fn evaluate_requirements(
    student: &StudentProfile,
    requirements: &PostingRequirements,
) -> EligibilityVerdict {
    let failed_checks = rules::failed_checks(student, requirements);
    let badges = failed_checks
        .iter()
        .map(|check| check.badge(requirements))
        .collect();

    EligibilityVerdict {
        is_qualified: failed_checks.is_empty(),
        failed_checks,
        badges,
    }
}
