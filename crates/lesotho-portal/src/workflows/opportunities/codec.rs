//! Lenient conversion between loose store documents and the typed portal model.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::domain::{
    AdmissionLedger, AdmissionOutcome, AdmissionRecord, Application, ApplicationId,
    ApplicationStatus, Posting, PostingId, PostingKind, StudentId, StudentProfile,
};
use super::eligibility::{lenient_number, parse_certificate_list, round_gpa, PostingRequirements};
use super::gpa::{compute_gpa, SubjectGrade};
use crate::store::Document;

fn text(document: &Document, field: &str) -> Option<String> {
    document
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn timestamp(document: &Document, field: &str) -> Option<DateTime<Utc>> {
    document
        .get(field)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn posting_ids(document: &Document, field: &str) -> Vec<PostingId> {
    string_list(document.get(field))
        .into_iter()
        .map(PostingId)
        .collect()
}

pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn subjects(document: &Document) -> Vec<SubjectGrade> {
    document
        .get("subjects")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn student_from_document(id: &str, document: &Document) -> StudentProfile {
    let gpa = match document.get("gpa").and_then(lenient_number) {
        Some(gpa) => Some(round_gpa(gpa)),
        None => {
            let graded = subjects(document);
            (!graded.is_empty()).then(|| compute_gpa(&graded))
        }
    };

    let work_experience = document
        .get("workExperience")
        .and_then(lenient_number)
        .filter(|years| *years > 0.0)
        .map(|years| years.floor().min(f64::from(u32::MAX)) as u32)
        .unwrap_or(0);

    let display_name = [text(document, "firstName"), text(document, "lastName")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let email = text(document, "email");
    let display_name = if display_name.is_empty() {
        email.clone().unwrap_or_else(|| id.to_string())
    } else {
        display_name
    };

    StudentProfile {
        id: StudentId(id.to_string()),
        display_name,
        email,
        gpa,
        certificates: document
            .get("certificates")
            .map(parse_certificate_list)
            .unwrap_or_default(),
        work_experience,
        applied_jobs: posting_ids(document, PostingKind::Job.applied_field()),
        applied_courses: posting_ids(document, PostingKind::Course.applied_field()),
        admissions: ledger_from_value(document.get("admittedInstitutions")),
    }
}

fn record_from_value(fallback_id: Option<&str>, value: &Value) -> Option<AdmissionRecord> {
    let entry = value.as_object()?;
    let id = text(entry, "id").or_else(|| fallback_id.map(str::to_string))?;
    let status = entry
        .get("status")
        .and_then(Value::as_str)
        .and_then(AdmissionOutcome::parse)?;

    Some(AdmissionRecord {
        id: PostingId(id),
        institution_id: text(entry, "institutionId"),
        name: text(entry, "name").unwrap_or_default(),
        program: text(entry, "program").unwrap_or_default(),
        status,
        admitted_at: timestamp(entry, "admittedAt"),
    })
}

/// Accepts the array shape, the legacy map keyed by posting id, and treats anything else
/// as an empty ledger.
pub(crate) fn ledger_from_value(value: Option<&Value>) -> AdmissionLedger {
    let mut records = Vec::new();
    let mut unrecognized = Vec::new();

    match value {
        Some(Value::Array(items)) => {
            for item in items {
                match record_from_value(None, item) {
                    Some(record) => records.push(record),
                    None => unrecognized.push(item.clone()),
                }
            }
        }
        Some(Value::Object(entries)) => {
            for (key, item) in entries {
                match record_from_value(Some(key), item) {
                    Some(record) => records.push(record),
                    None => unrecognized.push(item.clone()),
                }
            }
        }
        _ => {}
    }

    AdmissionLedger::from_records(records).with_unrecognized(unrecognized)
}

pub(crate) fn ledger_to_value(ledger: &AdmissionLedger) -> Value {
    let mut entries: Vec<Value> = ledger.records().iter().map(record_to_value).collect();
    entries.extend(ledger.unrecognized().iter().cloned());
    Value::Array(entries)
}

fn record_to_value(record: &AdmissionRecord) -> Value {
    let mut entry = Document::new();
    entry.insert("id".to_string(), json!(record.id.0));
    if let Some(institution_id) = &record.institution_id {
        entry.insert("institutionId".to_string(), json!(institution_id));
    }
    entry.insert("name".to_string(), json!(record.name));
    entry.insert("program".to_string(), json!(record.program));
    entry.insert("status".to_string(), json!(record.status.label()));
    if let Some(admitted_at) = record.admitted_at {
        entry.insert("admittedAt".to_string(), json!(admitted_at.to_rfc3339()));
    }
    Value::Object(entry)
}

pub(crate) fn posting_from_document(kind: PostingKind, id: &str, document: &Document) -> Posting {
    let title = match kind {
        PostingKind::Job => text(document, "title").or_else(|| text(document, "name")),
        PostingKind::Course => text(document, "name").or_else(|| text(document, "title")),
    };
    let owner_name = match kind {
        PostingKind::Job => text(document, "companyName"),
        PostingKind::Course => text(document, "institutionName"),
    };

    Posting {
        id: PostingId(id.to_string()),
        kind,
        title: title.unwrap_or_else(|| match kind {
            PostingKind::Job => "Untitled Job".to_string(),
            PostingKind::Course => "Unknown Course".to_string(),
        }),
        owner_id: text(document, kind.owner_field()),
        owner_name,
        requirements: PostingRequirements::from_document(document),
        is_active: document
            .get("isActive")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    }
}

/// `None` when the document lacks the student or posting reference.
pub(crate) fn application_from_document(
    kind: PostingKind,
    id: &str,
    document: &Document,
) -> Option<Application> {
    let student_id = text(document, "studentId")?;
    let posting_id = text(document, kind.posting_field())?;
    let status = document
        .get("status")
        .and_then(Value::as_str)
        .and_then(ApplicationStatus::parse)
        .unwrap_or(ApplicationStatus::Pending);

    Some(Application {
        id: ApplicationId(id.to_string()),
        kind,
        student_id: StudentId(student_id),
        posting_id: PostingId(posting_id),
        institution_id: text(document, "institutionId"),
        status,
        applied_at: timestamp(document, "appliedAt"),
        reviewed_at: timestamp(document, "reviewedAt"),
        published_at: timestamp(document, "publishedAt"),
    })
}

pub(crate) fn new_application_document(application: &Application) -> Document {
    let mut document = Document::new();
    document.insert("studentId".to_string(), json!(application.student_id.0));
    document.insert(
        application.kind.posting_field().to_string(),
        json!(application.posting_id.0),
    );
    if let Some(institution_id) = &application.institution_id {
        document.insert("institutionId".to_string(), json!(institution_id));
    }
    document.insert("status".to_string(), json!(application.status.label()));
    if let Some(applied_at) = application.applied_at {
        document.insert("appliedAt".to_string(), json!(applied_at.to_rfc3339()));
    }
    document
}
