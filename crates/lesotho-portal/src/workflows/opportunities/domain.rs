use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::eligibility::PostingRequirements;
use crate::store::Collection;

/// Store key of a student document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

/// Store key of a job or course document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostingId(pub String);

/// Store key of an application document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PostingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Jobs are posted by companies, courses are offered by institutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingKind {
    Job,
    Course,
}

impl PostingKind {
    pub const fn label(self) -> &'static str {
        match self {
            PostingKind::Job => "job",
            PostingKind::Course => "course",
        }
    }

    pub const fn postings(self) -> Collection {
        match self {
            PostingKind::Job => Collection::Jobs,
            PostingKind::Course => Collection::Courses,
        }
    }

    pub const fn applications(self) -> Collection {
        match self {
            PostingKind::Job => Collection::Applications,
            PostingKind::Course => Collection::CourseApplications,
        }
    }

    /// Collection holding the owning organization's profile.
    pub const fn organizations(self) -> Collection {
        match self {
            PostingKind::Job => Collection::Companies,
            PostingKind::Course => Collection::Institutions,
        }
    }

    /// Field on an application document referencing the posting.
    pub const fn posting_field(self) -> &'static str {
        match self {
            PostingKind::Job => "jobId",
            PostingKind::Course => "courseId",
        }
    }

    /// Field on a posting document referencing its owner.
    pub const fn owner_field(self) -> &'static str {
        match self {
            PostingKind::Job => "companyId",
            PostingKind::Course => "institutionId",
        }
    }

    /// Append-only set on the student document listing postings applied to.
    pub const fn applied_field(self) -> &'static str {
        match self {
            PostingKind::Job => "appliedJobs",
            PostingKind::Course => "appliedCourses",
        }
    }

    /// Parses the plural path segment used by the HTTP surface.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "jobs" => Some(PostingKind::Job),
            "courses" => Some(PostingKind::Course),
            _ => None,
        }
    }
}

/// Student profile fields consulted by eligibility and publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub display_name: String,
    pub email: Option<String>,
    /// Stored GPA; `None` when the student never recorded subject grades.
    pub gpa: Option<f64>,
    pub certificates: Vec<String>,
    pub work_experience: u32,
    pub applied_jobs: Vec<PostingId>,
    pub applied_courses: Vec<PostingId>,
    pub admissions: AdmissionLedger,
}

impl StudentProfile {
    pub fn applied(&self, kind: PostingKind) -> &[PostingId] {
        match kind {
            PostingKind::Job => &self.applied_jobs,
            PostingKind::Course => &self.applied_courses,
        }
    }

    pub fn has_applied(&self, kind: PostingKind, posting_id: &PostingId) -> bool {
        self.applied(kind).contains(posting_id)
    }
}

/// Job or course offering as seen by matching and publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Posting {
    pub id: PostingId,
    pub kind: PostingKind,
    pub title: String,
    /// Company id for jobs, institution id for courses.
    pub owner_id: Option<String>,
    /// Denormalized owner name when the posting document carries one.
    pub owner_name: Option<String>,
    pub requirements: PostingRequirements,
    pub is_active: bool,
}

/// Application lifecycle status as stored on application documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Waitlisted,
    /// Legacy marker written over the decision by older publishers.
    Published,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Accepted => "Accepted",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Waitlisted => "Waitlisted",
            ApplicationStatus::Published => "Published",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ApplicationStatus::Pending),
            "accepted" | "admitted" => Some(ApplicationStatus::Accepted),
            "rejected" => Some(ApplicationStatus::Rejected),
            "waitlisted" => Some(ApplicationStatus::Waitlisted),
            "published" => Some(ApplicationStatus::Published),
            _ => None,
        }
    }

    /// Reviewer decision carried by this status, if any.
    pub const fn decision(self) -> Option<AdmissionOutcome> {
        match self {
            ApplicationStatus::Accepted => Some(AdmissionOutcome::Accepted),
            ApplicationStatus::Rejected => Some(AdmissionOutcome::Rejected),
            ApplicationStatus::Waitlisted => Some(AdmissionOutcome::Waitlisted),
            ApplicationStatus::Pending | ApplicationStatus::Published => None,
        }
    }
}

impl From<AdmissionOutcome> for ApplicationStatus {
    fn from(value: AdmissionOutcome) -> Self {
        match value {
            AdmissionOutcome::Accepted => ApplicationStatus::Accepted,
            AdmissionOutcome::Rejected => ApplicationStatus::Rejected,
            AdmissionOutcome::Waitlisted => ApplicationStatus::Waitlisted,
        }
    }
}

/// Terminal reviewer decision propagated into a student's admission results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdmissionOutcome {
    Accepted,
    Rejected,
    Waitlisted,
}

impl AdmissionOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            AdmissionOutcome::Accepted => "Accepted",
            AdmissionOutcome::Rejected => "Rejected",
            AdmissionOutcome::Waitlisted => "Waitlisted",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        ApplicationStatus::parse(raw).and_then(ApplicationStatus::decision)
    }
}

/// Student application to a job or course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub kind: PostingKind,
    pub student_id: StudentId,
    pub posting_id: PostingId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Application {
    /// Lifecycle stage: the decision status, or `Published` once propagated.
    pub fn stage(&self) -> ApplicationStatus {
        match (self.status.decision(), self.published_at) {
            (Some(_), Some(_)) => ApplicationStatus::Published,
            _ => self.status,
        }
    }

    pub fn is_published(&self) -> bool {
        self.stage() == ApplicationStatus::Published
    }
}

/// Outcome entry embedded in `Student.admittedInstitutions`, unique per posting id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRecord {
    pub id: PostingId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    pub name: String,
    pub program: String,
    pub status: AdmissionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admitted_at: Option<DateTime<Utc>>,
}

/// Result of merging a record into an [`AdmissionLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    Unchanged,
    Replaced,
    Appended,
}

/// Ordered admission results keyed by posting id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AdmissionLedger {
    records: Vec<AdmissionRecord>,
    /// Stored entries that could not be decoded; written back verbatim.
    #[serde(skip)]
    unrecognized: Vec<serde_json::Value>,
}

impl AdmissionLedger {
    /// Builds a ledger, keeping the first position and the last value of repeated ids.
    pub fn from_records(records: impl IntoIterator<Item = AdmissionRecord>) -> Self {
        let mut ledger = Self::default();
        for record in records {
            ledger.upsert(record);
        }
        ledger
    }

    pub(crate) fn with_unrecognized(mut self, entries: Vec<serde_json::Value>) -> Self {
        self.unrecognized = entries;
        self
    }

    pub(crate) fn unrecognized(&self) -> &[serde_json::Value] {
        &self.unrecognized
    }

    pub fn records(&self) -> &[AdmissionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<AdmissionRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, posting_id: &PostingId) -> Option<&AdmissionRecord> {
        self.records.iter().find(|record| &record.id == posting_id)
    }

    /// Whether a record for `posting_id` already carries `outcome`.
    pub fn holds(&self, posting_id: &PostingId, outcome: AdmissionOutcome) -> bool {
        self.get(posting_id)
            .is_some_and(|record| record.status == outcome)
    }

    /// Replaces the record with the same id in place, or appends a new one.
    pub fn upsert(&mut self, record: AdmissionRecord) -> LedgerChange {
        match self.records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) if *existing == record => LedgerChange::Unchanged,
            Some(existing) => {
                *existing = record;
                LedgerChange::Replaced
            }
            None => {
                self.records.push(record);
                LedgerChange::Appended
            }
        }
    }
}
