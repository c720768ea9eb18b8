//! Propagates reviewer decisions into each student's `admittedInstitutions`.
//!
//! Every student is an independent unit: the student document write and the application
//! stamp are two separate single-document writes, and a failed unit never aborts the rest of
//! the batch. Re-running a publication converges on the same state, which is also how a crash
//! between the two writes is healed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use super::domain::{
    AdmissionOutcome, AdmissionRecord, Application, ApplicationId, LedgerChange, Posting,
    PostingId, PostingKind, StudentId,
};
use super::repository::{PortalRepository, RepositoryError};
use super::session::{PortalRole, PortalSession};
use crate::clock::Clock;
use crate::store::DocumentStore;

/// Organization name written into records when the owner cannot be resolved.
const UNKNOWN_OWNER: &str = "N/A";

/// Outcome of one publication run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    pub posting_id: PostingId,
    pub succeeded: Vec<StudentId>,
    pub failed: Vec<StudentId>,
    /// Applications without a decision, or superseded by a later entry for the same student.
    pub skipped: Vec<ApplicationId>,
    pub failures: Vec<PublishFailure>,
}

impl PublishReport {
    fn new(posting_id: PostingId) -> Self {
        Self {
            posting_id,
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Applications from `batch` belonging to students that failed, ready to be resubmitted.
    pub fn retry_batch(&self, batch: &[Application]) -> Vec<Application> {
        batch
            .iter()
            .filter(|application| self.failed.contains(&application.student_id))
            .cloned()
            .collect()
    }

    fn fail(&mut self, application: &Application, reason: PublishFailureReason) {
        self.failed.push(application.student_id.clone());
        self.failures.push(PublishFailure {
            student_id: application.student_id.clone(),
            application_id: application.id.clone(),
            reason,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishFailure {
    pub student_id: StudentId,
    pub application_id: ApplicationId,
    pub reason: PublishFailureReason,
}

/// Why a single student unit could not be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishFailureReason {
    StudentNotFound,
    PostingNotFound,
    PostingMismatch,
    Store(String),
}

impl fmt::Display for PublishFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishFailureReason::StudentNotFound => f.write_str("student not found"),
            PublishFailureReason::PostingNotFound => f.write_str("posting not found"),
            PublishFailureReason::PostingMismatch => {
                f.write_str("application belongs to another posting")
            }
            PublishFailureReason::Store(reason) => write!(f, "store unavailable: {reason}"),
        }
    }
}

impl Serialize for PublishFailureReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<RepositoryError> for PublishFailureReason {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Unavailable(reason) => PublishFailureReason::Store(reason),
            other => PublishFailureReason::Store(other.to_string()),
        }
    }
}

/// Caller-side errors rejected before any write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("no reviewed applications to publish")]
    EmptyBatch,
    #[error("{role:?} session may not publish decisions for {kind} {posting_id}")]
    Forbidden {
        role: PortalRole,
        kind: &'static str,
        posting_id: PostingId,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// What happened to one student unit that published cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UnitOutcome {
    ledger: LedgerChange,
    stamped: bool,
}

pub struct AdmissionPublisher<S> {
    repository: PortalRepository<S>,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl<S> AdmissionPublisher<S>
where
    S: DocumentStore + 'static,
{
    /// `concurrency` bounds how many student units are in flight; zero is treated as one.
    pub fn new(repository: PortalRepository<S>, clock: Arc<dyn Clock>, concurrency: usize) -> Self {
        Self {
            repository,
            clock,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn publish_admissions(
        &self,
        session: &PortalSession,
        kind: PostingKind,
        posting_id: &PostingId,
        reviewed: Vec<Application>,
    ) -> Result<PublishReport, PublishError> {
        let forbidden = || PublishError::Forbidden {
            role: session.role,
            kind: kind.label(),
            posting_id: posting_id.clone(),
        };
        if !session.reviews(kind) {
            return Err(forbidden());
        }
        if reviewed.is_empty() {
            return Err(PublishError::EmptyBatch);
        }

        let posting = match self.repository.posting(kind, posting_id).await {
            Ok(posting) if session.may_review(&posting) => Ok(posting),
            Ok(_) => return Err(forbidden()),
            Err(RepositoryError::NotFound { .. }) => Err(PublishFailureReason::PostingNotFound),
            Err(other) => Err(PublishFailureReason::from(other)),
        };

        let mut report = PublishReport::new(posting_id.clone());
        let units = self.plan(kind, posting_id, reviewed, &mut report);

        info!(
            kind = kind.label(),
            posting = %posting_id,
            units = units.len(),
            skipped = report.skipped.len(),
            "publishing admission decisions"
        );

        let posting = match posting {
            Ok(posting) => posting,
            Err(reason) => {
                for application in &units {
                    warn!(
                        student = %application.student_id,
                        posting = %posting_id,
                        reason = %reason,
                        "admission publication failed"
                    );
                    report.fail(application, reason.clone());
                }
                return Ok(report);
            }
        };

        let owner_name = match self.repository.owner_name(&posting).await {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_OWNER.to_string(),
            Err(error) => {
                warn!(posting = %posting_id, error = %error, "owner lookup failed");
                UNKNOWN_OWNER.to_string()
            }
        };
        let published_at = self.clock.now();
        let posting = Arc::new(posting);
        let owner_name: Arc<str> = Arc::from(owner_name);

        let mut outcomes: Vec<(usize, Result<UnitOutcome, PublishFailureReason>)> =
            stream::iter(units.iter().cloned().enumerate())
                .map(|(index, application)| {
                    let posting = Arc::clone(&posting);
                    let owner_name = Arc::clone(&owner_name);
                    async move {
                        let outcome = self
                            .publish_unit(&posting, &owner_name, &application, published_at)
                            .await;
                        (index, outcome)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        outcomes.sort_by_key(|(index, _)| *index);

        for (index, outcome) in outcomes {
            let application = &units[index];
            match outcome {
                Ok(unit) => {
                    if unit.ledger == LedgerChange::Unchanged && !unit.stamped {
                        info!(student = %application.student_id, "admission already published");
                    }
                    report.succeeded.push(application.student_id.clone());
                }
                Err(reason) => {
                    warn!(
                        student = %application.student_id,
                        posting = %posting_id,
                        reason = %reason,
                        "admission publication failed"
                    );
                    report.fail(application, reason);
                }
            }
        }

        info!(
            posting = %posting_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "admission publication finished"
        );
        Ok(report)
    }

    /// Splits the batch into publishable units, one per student, recording skips and
    /// mismatched applications on the report.
    fn plan(
        &self,
        kind: PostingKind,
        posting_id: &PostingId,
        reviewed: Vec<Application>,
        report: &mut PublishReport,
    ) -> Vec<Application> {
        let mut units: Vec<Application> = Vec::new();
        let mut positions: HashMap<StudentId, usize> = HashMap::new();

        for application in reviewed {
            if application.kind != kind || &application.posting_id != posting_id {
                report.fail(&application, PublishFailureReason::PostingMismatch);
                continue;
            }
            if application.status.decision().is_none() {
                report.skipped.push(application.id.clone());
                continue;
            }
            match positions.get(&application.student_id) {
                Some(&position) => {
                    let superseded = std::mem::replace(&mut units[position], application);
                    report.skipped.push(superseded.id);
                }
                None => {
                    positions.insert(application.student_id.clone(), units.len());
                    units.push(application);
                }
            }
        }

        units
    }

    async fn publish_unit(
        &self,
        posting: &Posting,
        owner_name: &str,
        application: &Application,
        published_at: DateTime<Utc>,
    ) -> Result<UnitOutcome, PublishFailureReason> {
        let Some(outcome) = application.status.decision() else {
            return Ok(UnitOutcome {
                ledger: LedgerChange::Unchanged,
                stamped: false,
            });
        };

        let student = match self.repository.student(&application.student_id).await {
            Ok(student) => student,
            Err(RepositoryError::NotFound { .. }) => {
                return Err(PublishFailureReason::StudentNotFound)
            }
            Err(other) => return Err(other.into()),
        };

        let ledger = if student.admissions.holds(&posting.id, outcome) {
            LedgerChange::Unchanged
        } else {
            let mut admissions = student.admissions.clone();
            let change = admissions.upsert(admission_record(
                posting,
                owner_name,
                outcome,
                published_at,
            ));
            self.repository
                .save_admissions(&student.id, &admissions)
                .await?;
            change
        };

        let stored = match self
            .repository
            .application(application.kind, &application.id)
            .await
        {
            Ok(stored) => Some(stored),
            Err(RepositoryError::NotFound { .. } | RepositoryError::Malformed { .. }) => None,
            Err(other) => return Err(other.into()),
        };
        let already_stamped = stored.is_some_and(|stored| {
            stored.published_at.is_some() && stored.status.decision() == Some(outcome)
        });

        let stamped = if already_stamped {
            false
        } else {
            let mut stamped = application.clone();
            stamped.published_at = Some(published_at);
            self.repository.record_publication(&stamped).await?;
            true
        };

        Ok(UnitOutcome { ledger, stamped })
    }
}

fn admission_record(
    posting: &Posting,
    owner_name: &str,
    outcome: AdmissionOutcome,
    published_at: DateTime<Utc>,
) -> AdmissionRecord {
    AdmissionRecord {
        id: posting.id.clone(),
        institution_id: posting.owner_id.clone(),
        name: owner_name.to_string(),
        program: posting.title.clone(),
        status: outcome,
        admitted_at: Some(published_at),
    }
}
