//! End-to-end admission publication through the public service facade: a student applies,
//! the owning institution decides, and the decision lands in the student's profile exactly
//! once no matter how often publication is repeated.

mod common {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    use lesotho_portal::clock::FixedClock;
    use lesotho_portal::config::PortalConfig;
    use lesotho_portal::store::{Collection, Document, MemoryDocumentStore};
    use lesotho_portal::workflows::opportunities::OpportunityService;

    pub(super) const INSTITUTION: &str = "inst-lerotholi";

    fn document(value: Value) -> Document {
        value.as_object().cloned().expect("object literal")
    }

    pub(super) fn store() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        store
            .seed(
                Collection::Institutions,
                INSTITUTION,
                document(json!({ "name": "Lerotholi Polytechnic" })),
            )
            .expect("seed institution");
        store
            .seed(
                Collection::Courses,
                "course-eng",
                document(json!({
                    "name": "Diploma in Civil Engineering",
                    "institutionId": INSTITUTION,
                    "minGPA": "2.5",
                })),
            )
            .expect("seed course");
        for (id, gpa) in [("stu-a", 3.1), ("stu-b", 2.8), ("stu-c", 2.5)] {
            store
                .seed(
                    Collection::Students,
                    id,
                    document(json!({ "firstName": "Student", "lastName": id, "gpa": gpa })),
                )
                .expect("seed student");
        }
        store
    }

    pub(super) fn service(store: &MemoryDocumentStore) -> OpportunityService<MemoryDocumentStore> {
        let clock = FixedClock::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0)
                .single()
                .expect("valid timestamp"),
        );
        OpportunityService::new(
            Arc::new(store.clone()),
            Arc::new(clock),
            &PortalConfig::default(),
        )
    }
}

use common::*;
use lesotho_portal::store::{Collection, DocumentStore};
use lesotho_portal::workflows::opportunities::{
    AdmissionOutcome, ApplicationStatus, PortalSession, PostingId, PostingKind, StudentId,
};

#[tokio::test]
async fn decisions_reach_student_profiles_once() {
    let store = store();
    let service = service(&store);
    let course = PostingId("course-eng".to_string());
    let registrar = PortalSession::institution(INSTITUTION);

    let decisions = [
        ("stu-a", ApplicationStatus::Accepted),
        ("stu-b", ApplicationStatus::Waitlisted),
        ("stu-c", ApplicationStatus::Rejected),
    ];
    for (student, decision) in decisions {
        let application = service
            .apply(
                &PortalSession::student(student),
                PostingKind::Course,
                &course,
            )
            .await
            .expect("eligible student applies");
        service
            .review(&registrar, PostingKind::Course, &application.id, decision)
            .await
            .expect("registrar decides");
    }

    let first = service
        .publish_posting(&registrar, PostingKind::Course, &course, &[])
        .await
        .expect("publish");
    let second = service
        .publish_posting(&registrar, PostingKind::Course, &course, &[])
        .await
        .expect("republish");

    assert!(first.is_complete());
    assert_eq!(first.succeeded.len(), 3);
    assert_eq!(first.succeeded, second.succeeded);

    let expected = [
        ("stu-a", AdmissionOutcome::Accepted),
        ("stu-b", AdmissionOutcome::Waitlisted),
        ("stu-c", AdmissionOutcome::Rejected),
    ];
    for (student, outcome) in expected {
        let ledger = service
            .admissions_for(&StudentId(student.to_string()))
            .await
            .expect("ledger");
        assert_eq!(ledger.len(), 1, "{student}");
        let record = ledger.get(&course).expect("record for course");
        assert_eq!(record.status, outcome);
        assert_eq!(record.name, "Lerotholi Polytechnic");
        assert_eq!(record.program, "Diploma in Civil Engineering");
    }

    assert_eq!(store.len(Collection::CourseApplications), 3);
}

#[tokio::test]
async fn missing_profile_is_reported_for_retry() {
    let store = store();
    let service = service(&store);
    let course = PostingId("course-eng".to_string());
    let registrar = PortalSession::institution(INSTITUTION);

    for student in ["stu-a", "stu-b"] {
        let application = service
            .apply(
                &PortalSession::student(student),
                PostingKind::Course,
                &course,
            )
            .await
            .expect("apply");
        service
            .review(
                &registrar,
                PostingKind::Course,
                &application.id,
                ApplicationStatus::Accepted,
            )
            .await
            .expect("review");
    }
    store
        .delete(Collection::Students, "stu-b")
        .await
        .expect("remove profile");

    let report = service
        .publish_posting(&registrar, PostingKind::Course, &course, &[])
        .await
        .expect("publish");

    assert_eq!(report.succeeded, vec![StudentId("stu-a".to_string())]);
    assert_eq!(report.failed, vec![StudentId("stu-b".to_string())]);
    assert_eq!(report.failures[0].reason.to_string(), "student not found");
}
