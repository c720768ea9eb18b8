use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::codec::{posting_from_document, student_from_document};
use super::domain::{ApplicationId, ApplicationStatus, PostingId, PostingKind, StudentId};
use super::eligibility::evaluate_eligibility;
use super::publisher::PublishError;
use super::repository::RepositoryError;
use super::service::{ApplyError, OpportunityService, ReviewError};
use super::session::{PortalRole, PortalSession};
use crate::store::{Document, DocumentStore};

pub const ROLE_HEADER: &str = "x-portal-role";
pub const USER_HEADER: &str = "x-portal-user";

type SharedService<S> = Arc<OpportunityService<S>>;

/// Router builder exposing eligibility, application, review, and publication endpoints.
pub fn opportunity_router<S>(service: SharedService<S>) -> Router
where
    S: DocumentStore + 'static,
{
    Router::new()
        .route("/api/v1/eligibility", post(eligibility_handler))
        .route(
            "/api/v1/students/:student_id/admissions",
            get(admissions_handler::<S>),
        )
        .nest(
            "/api/v1/jobs",
            posting_routes::<S>().layer(Extension(PostingKind::Job)),
        )
        .nest(
            "/api/v1/courses",
            posting_routes::<S>().layer(Extension(PostingKind::Course)),
        )
        .with_state(service)
}

fn posting_routes<S>() -> Router<SharedService<S>>
where
    S: DocumentStore + 'static,
{
    Router::new()
        .route("/", get(open_postings_handler::<S>))
        .route(
            "/:posting_id/applications",
            post(apply_handler::<S>).get(applicants_handler::<S>),
        )
        .route(
            "/applications/:application_id/status",
            put(review_handler::<S>),
        )
        .route("/:posting_id/publish", post(publish_handler::<S>))
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

/// Reads the caller identity forwarded by the authenticating front end.
fn session_from_headers(headers: &HeaderMap) -> Result<PortalSession, Response> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let role = header(ROLE_HEADER)
        .and_then(PortalRole::parse)
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "missing or unknown portal role"))?;
    let user = header(USER_HEADER)
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "missing portal user"))?;

    Ok(PortalSession::new(user, role))
}

fn repository_response(error: RepositoryError) -> Response {
    let status = match error {
        RepositoryError::NotFound { .. } => StatusCode::NOT_FOUND,
        RepositoryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RepositoryError::Malformed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error)
}

fn review_response(error: ReviewError) -> Response {
    match error {
        ReviewError::Forbidden => error_response(StatusCode::FORBIDDEN, error),
        ReviewError::InvalidTransition { .. } => error_response(StatusCode::CONFLICT, error),
        ReviewError::Repository(error) => repository_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EligibilityRequest {
    student: Document,
    posting: Document,
    #[serde(default)]
    kind: Option<PostingKind>,
}

pub(crate) async fn eligibility_handler(Json(request): Json<EligibilityRequest>) -> Response {
    let kind = request.kind.unwrap_or(PostingKind::Course);
    let student = student_from_document("inline", &request.student);
    let posting = posting_from_document(kind, "inline", &request.posting);
    let verdict = evaluate_eligibility(&student, &posting);
    (StatusCode::OK, Json(verdict)).into_response()
}

pub(crate) async fn open_postings_handler<S>(
    State(service): State<SharedService<S>>,
    Extension(kind): Extension<PostingKind>,
    headers: HeaderMap,
) -> Response
where
    S: DocumentStore + 'static,
{
    let session = match session_from_headers(&headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let Some(student_id) = session.student_id() else {
        return error_response(StatusCode::FORBIDDEN, "only students browse open postings");
    };

    match service.open_postings(&student_id, kind).await {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(error) => repository_response(error),
    }
}

pub(crate) async fn apply_handler<S>(
    State(service): State<SharedService<S>>,
    Extension(kind): Extension<PostingKind>,
    Path(posting_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: DocumentStore + 'static,
{
    let session = match session_from_headers(&headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match service.apply(&session, kind, &PostingId(posting_id)).await {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(ApplyError::NotEligible(verdict)) => {
            let payload = json!({
                "error": "requirements not met",
                "verdict": verdict,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(error @ ApplyError::NotStudent) => error_response(StatusCode::FORBIDDEN, error),
        Err(error @ ApplyError::PostingNotFound(_)) => error_response(StatusCode::NOT_FOUND, error),
        Err(error @ (ApplyError::PostingInactive(_) | ApplyError::AlreadyApplied(_))) => {
            error_response(StatusCode::CONFLICT, error)
        }
        Err(ApplyError::Repository(error)) => repository_response(error),
    }
}

pub(crate) async fn applicants_handler<S>(
    State(service): State<SharedService<S>>,
    Extension(kind): Extension<PostingKind>,
    Path(posting_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: DocumentStore + 'static,
{
    let session = match session_from_headers(&headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match service
        .applications_for_posting(&session, kind, &PostingId(posting_id))
        .await
    {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(error) => review_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    status: String,
}

pub(crate) async fn review_handler<S>(
    State(service): State<SharedService<S>>,
    Extension(kind): Extension<PostingKind>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ReviewRequest>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let session = match session_from_headers(&headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let Some(status) = ApplicationStatus::parse(&request.status) else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("unknown application status '{}'", request.status),
        );
    };

    match service
        .review(&session, kind, &ApplicationId(application_id), status)
        .await
    {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => review_response(error),
    }
}

/// Optional publish body; a non-empty `studentIds` retries only those students.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PublishRequest {
    #[serde(default)]
    student_ids: Vec<StudentId>,
}

pub(crate) async fn publish_handler<S>(
    State(service): State<SharedService<S>>,
    Extension(kind): Extension<PostingKind>,
    Path(posting_id): Path<String>,
    headers: HeaderMap,
    request: Option<Json<PublishRequest>>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let session = match session_from_headers(&headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let request = request.map(|Json(request)| request).unwrap_or_default();

    match service
        .publish_posting(&session, kind, &PostingId(posting_id), &request.student_ids)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error @ PublishError::EmptyBatch) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, error)
        }
        Err(error @ PublishError::Forbidden { .. }) => error_response(StatusCode::FORBIDDEN, error),
        Err(PublishError::Repository(error)) => repository_response(error),
    }
}

pub(crate) async fn admissions_handler<S>(
    State(service): State<SharedService<S>>,
    Path(student_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: DocumentStore + 'static,
{
    let session = match session_from_headers(&headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let allowed = match session.role {
        PortalRole::Admin => true,
        PortalRole::Student => session.user_id == student_id,
        PortalRole::Institution | PortalRole::Company => false,
    };
    if !allowed {
        return error_response(StatusCode::FORBIDDEN, "admission results are private");
    }

    match service.admissions_for(&StudentId(student_id)).await {
        Ok(ledger) => (StatusCode::OK, Json(ledger)).into_response(),
        Err(error) => repository_response(error),
    }
}
