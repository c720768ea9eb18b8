//! Student opportunities: eligibility matching, applications, reviewer decisions, and the
//! admission publisher that fans those decisions out to student profiles.

mod codec;
pub mod domain;
pub mod eligibility;
pub mod gpa;
pub mod publisher;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use domain::{
    AdmissionLedger, AdmissionOutcome, AdmissionRecord, Application, ApplicationId,
    ApplicationStatus, LedgerChange, Posting, PostingId, PostingKind, StudentId, StudentProfile,
};
pub use eligibility::{
    evaluate_eligibility, evaluate_requirements, EligibilityCheck, EligibilityVerdict,
    PostingRequirements,
};
pub use gpa::{compute_gpa, grade_points, GradeError, SubjectGrade};
pub use publisher::{
    AdmissionPublisher, PublishError, PublishFailure, PublishFailureReason, PublishReport,
};
pub use repository::{PortalRepository, RepositoryError};
pub use router::opportunity_router;
pub use service::{ApplicantView, ApplyError, OpportunityService, PostingView, ReviewError};
pub use session::{PortalRole, PortalSession};

use crate::store::Document;

/// Builds a student profile from a raw `students` document.
pub fn student_from_document(id: &str, document: &Document) -> StudentProfile {
    codec::student_from_document(id, document)
}

/// Builds a posting from a raw `jobs` or `courses` document.
pub fn posting_from_document(kind: PostingKind, id: &str, document: &Document) -> Posting {
    codec::posting_from_document(kind, id, document)
}
