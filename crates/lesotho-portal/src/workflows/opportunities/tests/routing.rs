use super::common::*;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::workflows::opportunities::domain::PostingKind;
use crate::workflows::opportunities::router::{ROLE_HEADER, USER_HEADER};

fn request(
    method: Method,
    uri: &str,
    session: Option<(&str, &str)>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((role, user)) = session {
        builder = builder.header(ROLE_HEADER, role).header(USER_HEADER, user);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

#[tokio::test]
async fn eligibility_route_evaluates_raw_documents() {
    let router = router(seeded_store());

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/eligibility",
            None,
            Some(json!({
                "student": { "gpa": "3.2", "workExperience": 1 },
                "posting": { "minGPA": 3.0, "requiredExperience": 2 },
            })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["isQualified"], json!(false));
    assert_eq!(payload["failedChecks"], json!(["experience"]));
}

#[tokio::test]
async fn apply_route_requires_a_session() {
    let router = router(seeded_store());

    let response = router
        .oneshot(request(Method::POST, "/api/v1/courses/course-42/applications", None, None))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn apply_route_creates_application_and_reports_ineligibility() {
    let store = seeded_store();
    seed_student(&store, "stu-1", json!({ "gpa": 3.0 }));
    seed_student(&store, "stu-2", json!({ "gpa": 1.8 }));
    let router = router(store.clone());

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/courses/course-42/applications",
            Some(("student", "stu-1")),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], json!("Pending"));
    assert_eq!(payload["postingId"], json!("course-42"));

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/courses/course-42/applications",
            Some(("student", "stu-2")),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["verdict"]["failedChecks"], json!(["gpa"]));
}

#[tokio::test]
async fn review_and_publish_routes_drive_the_decision_flow() {
    let store = seeded_store();
    seed_student(&store, "stu-1", json!({}));
    let application = seed_application(
        &store,
        PostingKind::Course,
        "capp-1",
        "stu-1",
        "course-42",
        "Pending",
    );
    let router = router(store.clone());
    let registrar = Some(("institution", INSTITUTION));

    let response = router
        .clone()
        .oneshot(request(
            Method::PUT,
            &format!("/api/v1/courses/applications/{}/status", application.id),
            registrar,
            Some(json!({ "status": "accepted" })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/v1/courses/course-42/publish",
                registrar,
                None,
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["succeeded"], json!(["stu-1"]));
        assert_eq!(payload["failed"], json!([]));
    }

    let response = router
        .oneshot(request(
            Method::GET,
            "/api/v1/students/stu-1/admissions",
            Some(("student", "stu-1")),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(1));
    assert_eq!(payload[0]["id"], json!("course-42"));
    assert_eq!(payload[0]["status"], json!("Accepted"));
}

#[tokio::test]
async fn review_route_maps_errors_to_statuses() {
    let store = seeded_store();
    seed_student(&store, "stu-1", json!({}));
    let application = seed_application(
        &store,
        PostingKind::Course,
        "capp-1",
        "stu-1",
        "course-42",
        "Pending",
    );
    let router = router(store);
    let uri = format!("/api/v1/courses/applications/{}/status", application.id);

    let cases = [
        (
            Some(("institution", INSTITUTION)),
            json!({ "status": "archived" }),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            Some(("institution", INSTITUTION)),
            json!({ "status": "Pending" }),
            StatusCode::CONFLICT,
        ),
        (
            Some(("company", COMPANY)),
            json!({ "status": "Accepted" }),
            StatusCode::FORBIDDEN,
        ),
    ];
    for (session, body, expected) in cases {
        let response = router
            .clone()
            .oneshot(request(Method::PUT, &uri, session, Some(body)))
            .await
            .expect("route executes");
        assert_eq!(response.status(), expected);
    }

    let response = router
        .oneshot(request(
            Method::PUT,
            "/api/v1/courses/applications/capp-404/status",
            Some(("institution", INSTITUTION)),
            Some(json!({ "status": "Accepted" })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn publish_route_rejects_empty_batches_and_foreign_sessions() {
    let store = seeded_store();
    let router = router(store);

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/jobs/job-7/publish",
            Some(("company", COMPANY)),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/jobs/job-7/publish",
            Some(("student", "stu-1")),
            Some(json!({ "studentIds": ["stu-1"] })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admissions_route_is_private_to_the_student() {
    let store = seeded_store();
    seed_student(&store, "stu-1", json!({}));
    let router = router(store);

    let response = router
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/v1/students/stu-1/admissions",
            Some(("student", "stu-2")),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(request(
            Method::GET,
            "/api/v1/students/stu-1/admissions",
            Some(("admin", "ops")),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await, json!([]));
}

#[tokio::test]
async fn listing_routes_serve_students_and_reviewers() {
    let store = seeded_store();
    seed_student(
        &store,
        "stu-1",
        json!({ "gpa": 3.9, "certificates": ["CCNA"], "workExperience": 3 }),
    );
    seed_application(
        &store,
        PostingKind::Job,
        "app-1",
        "stu-1",
        "job-7",
        "Pending",
    );
    let router = router(store);

    let response = router
        .clone()
        .oneshot(request(Method::GET, "/api/v1/jobs", Some(("student", "stu-1")), None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload[0]["verdict"]["isQualified"], json!(true));

    let response = router
        .oneshot(request(
            Method::GET,
            "/api/v1/jobs/job-7/applications",
            Some(("company", COMPANY)),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload[0]["application"]["studentId"], json!("stu-1"));
    assert_eq!(payload[0]["verdict"]["isQualified"], json!(true));
}
