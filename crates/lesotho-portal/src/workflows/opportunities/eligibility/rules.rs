use super::requirements::PostingRequirements;
use super::EligibilityCheck;
use crate::workflows::opportunities::domain::StudentProfile;

/// Exact `>=` on two-decimal values; a student without a GPA fails a set threshold.
fn gpa_satisfied(student: &StudentProfile, requirements: &PostingRequirements) -> bool {
    match requirements.min_gpa {
        None => true,
        Some(min_gpa) => student.gpa.is_some_and(|gpa| gpa >= min_gpa),
    }
}

/// Each requirement must be a case-insensitive substring of at least one held certificate.
fn certificates_satisfied(student: &StudentProfile, requirements: &PostingRequirements) -> bool {
    let held: Vec<String> = student
        .certificates
        .iter()
        .map(|certificate| certificate.to_lowercase())
        .collect();

    requirements.required_certificates.iter().all(|required| {
        let needle = required.trim().to_lowercase();
        held.iter().any(|certificate| certificate.contains(&needle))
    })
}

fn experience_satisfied(student: &StudentProfile, requirements: &PostingRequirements) -> bool {
    requirements
        .required_experience
        .map_or(true, |years| student.work_experience >= years)
}

pub(crate) fn failed_checks(
    student: &StudentProfile,
    requirements: &PostingRequirements,
) -> Vec<EligibilityCheck> {
    let mut failed = Vec::new();

    if !gpa_satisfied(student, requirements) {
        failed.push(EligibilityCheck::Gpa);
    }
    if !certificates_satisfied(student, requirements) {
        failed.push(EligibilityCheck::Certificates);
    }
    if !experience_satisfied(student, requirements) {
        failed.push(EligibilityCheck::Experience);
    }

    failed
}
