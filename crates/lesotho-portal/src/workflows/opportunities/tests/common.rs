use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use crate::clock::{Clock, FixedClock};
use crate::config::PortalConfig;
use crate::store::{
    Collection, Document, DocumentStore, FieldFilter, MemoryDocumentStore, StoreError,
    StoredDocument,
};
use crate::workflows::opportunities::codec::application_from_document;
use crate::workflows::opportunities::domain::{
    Application, ApplicationId, PostingId, PostingKind, StudentId,
};
use crate::workflows::opportunities::{opportunity_router, OpportunityService, PortalRepository};

pub(super) const INSTITUTION: &str = "inst-nul";
pub(super) const COMPANY: &str = "co-vodacom";

pub(super) fn published_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(published_at()))
}

pub(super) fn document(value: Value) -> Document {
    value.as_object().cloned().expect("object literal")
}

pub(super) fn student_id(id: &str) -> StudentId {
    StudentId(id.to_string())
}

pub(super) fn posting_id(id: &str) -> PostingId {
    PostingId(id.to_string())
}

/// Store seeded with one institution, one company, and a course and a job each owns.
pub(super) fn seeded_store() -> MemoryDocumentStore {
    let store = MemoryDocumentStore::new();
    store
        .seed(
            Collection::Institutions,
            INSTITUTION,
            document(json!({ "name": "National University of Lesotho" })),
        )
        .expect("seed institution");
    store
        .seed(
            Collection::Companies,
            COMPANY,
            document(json!({ "name": "Vodacom Lesotho" })),
        )
        .expect("seed company");
    store
        .seed(
            Collection::Courses,
            "course-42",
            document(json!({
                "name": "BSc Computer Science",
                "institutionId": INSTITUTION,
                "minGPA": 2.5,
            })),
        )
        .expect("seed course");
    store
        .seed(
            Collection::Jobs,
            "job-7",
            document(json!({
                "title": "Junior Network Engineer",
                "companyId": COMPANY,
                "minGPA": "3.0",
                "requiredCertificates": "ccna",
                "requiredExperience": 1,
                "applicants": [],
            })),
        )
        .expect("seed job");
    store
}

pub(super) fn seed_student(store: &MemoryDocumentStore, id: &str, profile: Value) {
    let mut data = document(json!({
        "firstName": "Student",
        "lastName": id,
        "email": format!("{id}@students.ls"),
    }));
    data.extend(document(profile));
    store
        .seed(Collection::Students, id, data)
        .expect("seed student");
}

/// Seeds an application document and returns it decoded.
pub(super) fn seed_application(
    store: &MemoryDocumentStore,
    kind: PostingKind,
    id: &str,
    student: &str,
    posting: &str,
    status: &str,
) -> Application {
    let mut data = document(json!({
        "studentId": student,
        "status": status,
        "appliedAt": "2025-01-02T08:00:00+00:00",
    }));
    data.insert(kind.posting_field().to_string(), json!(posting));
    store
        .seed(kind.applications(), id, data.clone())
        .expect("seed application");
    application_from_document(kind, id, &data).expect("complete application")
}

pub(super) fn stored_application(
    store: &MemoryDocumentStore,
    kind: PostingKind,
    id: &ApplicationId,
) -> Document {
    store
        .snapshot(kind.applications(), &id.0)
        .expect("application present")
}

pub(super) fn admissions(store: &MemoryDocumentStore, student: &str) -> Value {
    store
        .snapshot(Collection::Students, student)
        .and_then(|data| data.get("admittedInstitutions").cloned())
        .unwrap_or(Value::Null)
}

pub(super) fn portal_config(concurrency: usize) -> PortalConfig {
    PortalConfig {
        publish_concurrency: concurrency,
    }
}

pub(super) fn build_service<S>(store: S) -> OpportunityService<S>
where
    S: DocumentStore + 'static,
{
    OpportunityService::new(Arc::new(store), clock(), &portal_config(4))
}

pub(super) fn repository<S>(store: S) -> PortalRepository<S>
where
    S: DocumentStore + 'static,
{
    PortalRepository::new(Arc::new(store))
}

pub(super) fn router(store: MemoryDocumentStore) -> axum::Router {
    opportunity_router(Arc::new(build_service(store)))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Wraps the memory store and fails operations touching chosen documents.
#[derive(Debug, Clone, Default)]
pub(super) struct FlakyStore {
    pub(super) inner: MemoryDocumentStore,
    outages: Arc<Mutex<HashSet<(Collection, String)>>>,
    write_outages: Arc<Mutex<HashSet<(Collection, String)>>>,
}

impl FlakyStore {
    pub(super) fn new(inner: MemoryDocumentStore) -> Self {
        Self {
            inner,
            outages: Arc::default(),
            write_outages: Arc::default(),
        }
    }

    pub(super) fn fail(&self, collection: Collection, id: &str) {
        self.outages
            .lock()
            .expect("outage mutex poisoned")
            .insert((collection, id.to_string()));
    }

    /// Fails writes to the document while reads keep succeeding.
    pub(super) fn fail_writes(&self, collection: Collection, id: &str) {
        self.write_outages
            .lock()
            .expect("outage mutex poisoned")
            .insert((collection, id.to_string()));
    }

    pub(super) fn heal(&self) {
        self.outages.lock().expect("outage mutex poisoned").clear();
        self.write_outages
            .lock()
            .expect("outage mutex poisoned")
            .clear();
    }

    fn check(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let outages = self.outages.lock().expect("outage mutex poisoned");
        if outages.contains(&(collection, id.to_string())) {
            return Err(StoreError::Unavailable(format!(
                "deadline exceeded for {}/{id}",
                collection.name()
            )));
        }
        Ok(())
    }

    fn check_write(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.check(collection, id)?;
        let outages = self.write_outages.lock().expect("outage mutex poisoned");
        if outages.contains(&(collection, id.to_string())) {
            return Err(StoreError::Unavailable(format!(
                "write rejected for {}/{id}",
                collection.name()
            )));
        }
        Ok(())
    }
}

/// Clock that advances one minute on every reading.
#[derive(Debug)]
pub(super) struct SteppingClock {
    next: Mutex<DateTime<Utc>>,
}

impl SteppingClock {
    pub(super) fn starting_at(instant: DateTime<Utc>) -> Self {
        Self {
            next: Mutex::new(instant),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().expect("clock mutex poisoned");
        let now = *next;
        *next = now + Duration::minutes(1);
        now
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.check(collection, id)?;
        self.inner.get(collection, id).await
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[FieldFilter],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.query(collection, filters).await
    }

    async fn create(&self, collection: Collection, data: Document) -> Result<String, StoreError> {
        self.inner.create(collection, data).await
    }

    async fn update_merge(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> Result<(), StoreError> {
        self.check_write(collection, id)?;
        self.inner.update_merge(collection, id, patch).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.check_write(collection, id)?;
        self.inner.delete(collection, id).await
    }
}
