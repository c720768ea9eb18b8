use lesotho_portal::store::{Collection, Document, MemoryDocumentStore, StoreError};
use lesotho_portal::workflows::opportunities::PostingKind;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) const DEMO_INSTITUTION: &str = "inst-nul";
pub(crate) const DEMO_COMPANY: &str = "co-econet";
pub(crate) const DEMO_COURSE: &str = "course-bsc-cs";
pub(crate) const DEMO_JOB: &str = "job-network-intern";

fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Seeds the organizations, postings, and students used by `demo` and `serve --seed-demo`.
pub(crate) fn seed_demo_store(store: &MemoryDocumentStore) -> Result<(), StoreError> {
    store.seed(
        Collection::Institutions,
        DEMO_INSTITUTION,
        object(json!({ "name": "National University of Lesotho", "location": "Roma" })),
    )?;
    store.seed(
        Collection::Companies,
        DEMO_COMPANY,
        object(json!({ "name": "Econet Telecom Lesotho", "industry": "Telecommunications" })),
    )?;
    store.seed(
        Collection::Courses,
        DEMO_COURSE,
        object(json!({
            "name": "BSc Computer Science",
            "institutionId": DEMO_INSTITUTION,
            "minGPA": "2.8",
            "isActive": true,
        })),
    )?;
    store.seed(
        Collection::Jobs,
        DEMO_JOB,
        object(json!({
            "title": "Network Operations Intern",
            "companyId": DEMO_COMPANY,
            "minGPA": 3.0,
            "requiredCertificates": "ccna",
            "requiredExperience": 1,
            "applicants": [],
        })),
    )?;

    let students = [
        ("stu-palesa", "Palesa", "Mohapi", json!(3.6), json!(["Cisco CCNA"]), 2),
        ("stu-thabo", "Thabo", "Letsie", json!("3.1"), json!([]), 0),
        ("stu-mpho", "Mpho", "Sekhonyana", json!(2.4), json!(["First Aid"]), 1),
        ("stu-lineo", "Lineo", "Ramoholi", json!(2.9), json!("Microsoft Excel"), 0),
    ];
    for (id, first, last, gpa, certificates, experience) in students {
        store.seed(
            Collection::Students,
            id,
            object(json!({
                "firstName": first,
                "lastName": last,
                "email": format!("{}@students.nul.ls", first.to_lowercase()),
                "gpa": gpa,
                "certificates": certificates,
                "workExperience": experience,
            })),
        )?;
    }

    Ok(())
}

/// Parses a JSON object from the command line.
pub(crate) fn parse_document(raw: &str) -> Result<Document, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(err) => Err(format!("invalid JSON ({err})")),
    }
}

pub(crate) fn parse_kind(raw: &str) -> Result<PostingKind, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "job" | "jobs" => Ok(PostingKind::Job),
        "course" | "courses" => Ok(PostingKind::Course),
        other => Err(format!("unknown posting kind '{other}' (expected job or course)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_store_holds_every_collection() {
        let store = MemoryDocumentStore::new();
        seed_demo_store(&store).expect("seed demo data");

        assert_eq!(store.len(Collection::Students), 4);
        assert_eq!(store.len(Collection::Courses), 1);
        assert_eq!(store.len(Collection::Jobs), 1);
        assert!(store.snapshot(Collection::Institutions, DEMO_INSTITUTION).is_some());
    }

    #[test]
    fn command_line_documents_must_be_objects() {
        assert!(parse_document(r#"{ "gpa": 3.2 }"#).is_ok());
        assert!(parse_document("[1, 2]").is_err());
        assert!(parse_document("{ gpa").is_err());
        assert_eq!(parse_kind("Jobs"), Ok(PostingKind::Job));
        assert!(parse_kind("internship").is_err());
    }
}
