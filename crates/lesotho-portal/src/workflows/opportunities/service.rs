use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::domain::{
    AdmissionLedger, Application, ApplicationId, ApplicationStatus, Posting, PostingId,
    PostingKind, StudentId,
};
use super::eligibility::{evaluate_eligibility, EligibilityVerdict};
use super::publisher::{AdmissionPublisher, PublishError, PublishReport};
use super::repository::{PortalRepository, RepositoryError};
use super::session::PortalSession;
use crate::clock::Clock;
use crate::config::PortalConfig;
use crate::store::DocumentStore;

/// Posting listed to a student together with whether the Apply action is enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingView {
    pub posting: Posting,
    pub verdict: EligibilityVerdict,
}

/// Reviewer listing entry. `verdict` is `None` when the applicant's profile is gone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantView {
    pub application: Application,
    pub student_name: Option<String>,
    pub verdict: Option<EligibilityVerdict>,
}

/// Service composing the repository, eligibility rules, and admission publisher.
pub struct OpportunityService<S> {
    repository: PortalRepository<S>,
    publisher: AdmissionPublisher<S>,
    clock: Arc<dyn Clock>,
}

impl<S> OpportunityService<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: &PortalConfig) -> Self {
        let repository = PortalRepository::new(store);
        let publisher = AdmissionPublisher::new(
            repository.clone(),
            Arc::clone(&clock),
            config.publish_concurrency,
        );
        Self {
            repository,
            publisher,
            clock,
        }
    }

    pub fn repository(&self) -> &PortalRepository<S> {
        &self.repository
    }

    /// Submits the session's student to `posting_id`.
    pub async fn apply(
        &self,
        session: &PortalSession,
        kind: PostingKind,
        posting_id: &PostingId,
    ) -> Result<Application, ApplyError> {
        let student_id = session.student_id().ok_or(ApplyError::NotStudent)?;

        let posting = match self.repository.posting(kind, posting_id).await {
            Ok(posting) => posting,
            Err(RepositoryError::NotFound { .. }) => {
                return Err(ApplyError::PostingNotFound(posting_id.clone()))
            }
            Err(other) => return Err(other.into()),
        };
        if !posting.is_active {
            return Err(ApplyError::PostingInactive(posting_id.clone()));
        }

        let student = self.repository.student(&student_id).await?;
        if student.has_applied(kind, posting_id) {
            return Err(ApplyError::AlreadyApplied(posting_id.clone()));
        }

        let verdict = evaluate_eligibility(&student, &posting);
        if !verdict.is_qualified {
            return Err(ApplyError::NotEligible(verdict));
        }

        // A submission whose student write failed left its application behind; reuse it.
        let existing = self
            .repository
            .applications_for_posting(kind, posting_id)
            .await?
            .into_iter()
            .find(|application| application.student_id == student.id);

        let application = match existing {
            Some(existing) => existing,
            None => {
                let application = Application {
                    id: ApplicationId(String::new()),
                    kind,
                    student_id: student.id.clone(),
                    posting_id: posting.id.clone(),
                    institution_id: match kind {
                        PostingKind::Course => posting.owner_id.clone(),
                        PostingKind::Job => None,
                    },
                    status: ApplicationStatus::Pending,
                    applied_at: Some(self.clock.now()),
                    reviewed_at: None,
                    published_at: None,
                };
                self.repository.insert_application(application).await?
            }
        };

        self.repository
            .append_applied(&student, kind, posting_id)
            .await?;
        if kind == PostingKind::Job {
            self.repository
                .append_applicant(posting_id, &student.id)
                .await?;
        }

        info!(
            kind = kind.label(),
            posting = %posting_id,
            student = %student.id,
            application = %application.id,
            "application submitted"
        );
        Ok(application)
    }

    /// Records a reviewer decision. Decisions may be revised until they are published.
    pub async fn review(
        &self,
        session: &PortalSession,
        kind: PostingKind,
        application_id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, ReviewError> {
        if !session.reviews(kind) {
            return Err(ReviewError::Forbidden);
        }

        let mut application = self.repository.application(kind, application_id).await?;
        let posting = self
            .repository
            .posting(kind, &application.posting_id)
            .await?;
        if !session.may_review(&posting) {
            return Err(ReviewError::Forbidden);
        }

        let from = application.stage();
        if status.decision().is_none() || from == ApplicationStatus::Published {
            return Err(ReviewError::InvalidTransition { from, to: status });
        }

        application.status = status;
        application.reviewed_at = Some(self.clock.now());
        self.repository.record_review(&application).await?;

        info!(
            application = %application.id,
            from = from.label(),
            to = status.label(),
            "application reviewed"
        );
        Ok(application)
    }

    /// Applications to a posting, each annotated with the applicant's current verdict.
    pub async fn applications_for_posting(
        &self,
        session: &PortalSession,
        kind: PostingKind,
        posting_id: &PostingId,
    ) -> Result<Vec<ApplicantView>, ReviewError> {
        if !session.reviews(kind) {
            return Err(ReviewError::Forbidden);
        }
        let posting = self.repository.posting(kind, posting_id).await?;
        if !session.may_review(&posting) {
            return Err(ReviewError::Forbidden);
        }

        let applications = self
            .repository
            .applications_for_posting(kind, posting_id)
            .await?;
        let mut views = Vec::with_capacity(applications.len());
        for application in applications {
            let student = match self.repository.student(&application.student_id).await {
                Ok(student) => Some(student),
                Err(RepositoryError::NotFound { .. }) => None,
                Err(other) => return Err(other.into()),
            };
            views.push(ApplicantView {
                student_name: student.as_ref().map(|student| student.display_name.clone()),
                verdict: student
                    .as_ref()
                    .map(|student| evaluate_eligibility(student, &posting)),
                application,
            });
        }
        Ok(views)
    }

    /// Active postings of `kind`; ineligible postings stay listed with a disabled Apply.
    pub async fn open_postings(
        &self,
        student_id: &StudentId,
        kind: PostingKind,
    ) -> Result<Vec<PostingView>, RepositoryError> {
        let student = self.repository.student(student_id).await?;
        let postings = self.repository.postings(kind).await?;
        Ok(postings
            .into_iter()
            .filter(|posting| posting.is_active)
            .map(|posting| PostingView {
                verdict: evaluate_eligibility(&student, &posting),
                posting,
            })
            .collect())
    }

    pub async fn admissions_for(
        &self,
        student_id: &StudentId,
    ) -> Result<AdmissionLedger, RepositoryError> {
        Ok(self.repository.student(student_id).await?.admissions)
    }

    /// Publishes an explicit batch of reviewed applications.
    pub async fn publish_admissions(
        &self,
        session: &PortalSession,
        kind: PostingKind,
        posting_id: &PostingId,
        reviewed: Vec<Application>,
    ) -> Result<PublishReport, PublishError> {
        self.publisher
            .publish_admissions(session, kind, posting_id, reviewed)
            .await
    }

    /// Publishes every application stored for `posting_id`, optionally restricted to the
    /// students listed in `only` when retrying a partial failure.
    pub async fn publish_posting(
        &self,
        session: &PortalSession,
        kind: PostingKind,
        posting_id: &PostingId,
        only: &[StudentId],
    ) -> Result<PublishReport, PublishError> {
        let mut reviewed = self
            .repository
            .applications_for_posting(kind, posting_id)
            .await?;
        if !only.is_empty() {
            reviewed.retain(|application| only.contains(&application.student_id));
        }
        self.publish_admissions(session, kind, posting_id, reviewed)
            .await
    }
}

/// Error raised when a student applies to a posting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplyError {
    #[error("only students can apply")]
    NotStudent,
    #[error("posting {0} not found")]
    PostingNotFound(PostingId),
    #[error("posting {0} is no longer accepting applications")]
    PostingInactive(PostingId),
    #[error("already applied to {0}")]
    AlreadyApplied(PostingId),
    #[error("requirements not met: {}", .0.failed_labels().join(", "))]
    NotEligible(EligibilityVerdict),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Error raised by reviewer actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("session may not review this posting")]
    Forbidden,
    #[error("cannot move application from {} to {}", .from.label(), .to.label())]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
