//! Eligibility matching against raw store documents, including the loosely typed legacy
//! values still present in older postings and profiles.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use lesotho_portal::clock::SystemClock;
use lesotho_portal::config::PortalConfig;
use lesotho_portal::store::{Document, MemoryDocumentStore};
use lesotho_portal::workflows::opportunities::{
    evaluate_eligibility, opportunity_router, posting_from_document, student_from_document,
    OpportunityService, PostingKind,
};

fn document(value: Value) -> Document {
    value.as_object().cloned().expect("object literal")
}

fn failed(student: Value, posting: Value) -> Vec<&'static str> {
    let student = student_from_document("stu-1", &document(student));
    let posting = posting_from_document(PostingKind::Job, "job-1", &document(posting));
    evaluate_eligibility(&student, &posting).failed_labels()
}

#[test]
fn matching_table() {
    let cases: Vec<(Value, Value, Vec<&str>)> = vec![
        (json!({ "gpa": 1.0 }), json!({}), vec![]),
        (json!({ "gpa": 2.5 }), json!({ "minGPA": 2.5 }), vec![]),
        (json!({ "gpa": 2.49 }), json!({ "minGPA": 2.5 }), vec!["gpa"]),
        (json!({ "gpa": "3.75" }), json!({ "minGPA": "3.7" }), vec![]),
        (
            json!({ "certificates": ["AWS Certified Developer"] }),
            json!({ "requiredCertificates": "aws" }),
            vec![],
        ),
        (
            json!({ "certificates": "Microsoft Excel, First Aid" }),
            json!({ "requiredCertificates": "excel, first aid, forklift" }),
            vec!["certificates"],
        ),
        (
            json!({ "gpa": 3.2, "workExperience": 1 }),
            json!({ "minGPA": 3.0, "requiredExperience": 2 }),
            vec!["experience"],
        ),
        (
            json!({ "gpa": 3.0, "workExperience": "4" }),
            json!({ "minGPA": null, "requiredExperience": "abc" }),
            vec![],
        ),
        (
            json!({
                "subjects": [
                    { "name": "Maths", "symbol": "B" },
                    { "name": "English", "symbol": "C" }
                ]
            }),
            json!({ "minGPA": 2.5 }),
            vec![],
        ),
    ];

    for (student, posting, expected) in cases {
        assert_eq!(
            failed(student.clone(), posting.clone()),
            expected,
            "student {student} vs posting {posting}"
        );
    }
}

#[tokio::test]
async fn eligibility_endpoint_accepts_job_postings() {
    let service = OpportunityService::new(
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(SystemClock),
        &PortalConfig::default(),
    );
    let router = opportunity_router(Arc::new(service));

    let body = json!({
        "kind": "job",
        "student": { "gpa": 3.9, "certificates": ["CompTIA Security+"] },
        "posting": { "title": "SOC Analyst", "requiredCertificates": "security+, ccna" },
    });
    let response = router
        .oneshot(
            Request::post("/api/v1/eligibility")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
                .expect("request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    let payload: Value = serde_json::from_slice(&bytes).expect("json payload");
    assert_eq!(payload["isQualified"], json!(false));
    assert_eq!(payload["failedChecks"], json!(["certificates"]));
    assert_eq!(
        payload["badges"],
        json!(["Requires certificates: security+, ccna"]),
    );
}
