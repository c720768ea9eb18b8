use std::sync::Arc;

use serde_json::{json, Value};

use super::codec::{
    application_from_document, ledger_to_value, new_application_document,
    posting_from_document, string_list, student_from_document,
};
use super::domain::{
    AdmissionLedger, Application, ApplicationId, Posting, PostingId, PostingKind, StudentId,
    StudentProfile,
};
use crate::store::{Collection, Document, DocumentStore, FieldFilter, StoreError};

/// Typed access to the portal collections.
pub struct PortalRepository<S> {
    store: Arc<S>,
}

impl<S> Clone for PortalRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> PortalRepository<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn require(&self, collection: Collection, id: &str) -> Result<Document, RepositoryError> {
        self.store
            .get(collection, id)
            .await?
            .map(|stored| stored.data)
            .ok_or_else(|| RepositoryError::NotFound {
                collection: collection.name(),
                id: id.to_string(),
            })
    }

    pub async fn student(&self, id: &StudentId) -> Result<StudentProfile, RepositoryError> {
        let document = self.require(Collection::Students, &id.0).await?;
        Ok(student_from_document(&id.0, &document))
    }

    pub async fn posting(
        &self,
        kind: PostingKind,
        id: &PostingId,
    ) -> Result<Posting, RepositoryError> {
        let document = self.require(kind.postings(), &id.0).await?;
        Ok(posting_from_document(kind, &id.0, &document))
    }

    pub async fn postings(&self, kind: PostingKind) -> Result<Vec<Posting>, RepositoryError> {
        let documents = self.store.query(kind.postings(), &[]).await?;
        Ok(documents
            .iter()
            .map(|stored| posting_from_document(kind, &stored.id, &stored.data))
            .collect())
    }

    /// Display name of the company or institution owning `posting`.
    pub async fn owner_name(&self, posting: &Posting) -> Result<Option<String>, RepositoryError> {
        if let Some(name) = &posting.owner_name {
            return Ok(Some(name.clone()));
        }
        let Some(owner_id) = &posting.owner_id else {
            return Ok(None);
        };

        let owner = self.store.get(posting.kind.organizations(), owner_id).await?;
        Ok(owner.and_then(|stored| {
            stored
                .data
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
        }))
    }

    pub async fn application(
        &self,
        kind: PostingKind,
        id: &ApplicationId,
    ) -> Result<Application, RepositoryError> {
        let collection = kind.applications();
        let document = self.require(collection, &id.0).await?;
        application_from_document(kind, &id.0, &document).ok_or_else(|| {
            RepositoryError::Malformed {
                collection: collection.name(),
                id: id.0.clone(),
            }
        })
    }

    /// Applications referencing `posting_id`; malformed documents are skipped.
    pub async fn applications_for_posting(
        &self,
        kind: PostingKind,
        posting_id: &PostingId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let filter = FieldFilter::eq(kind.posting_field(), posting_id.0.clone());
        let documents = self.store.query(kind.applications(), &[filter]).await?;
        Ok(documents
            .iter()
            .filter_map(|stored| application_from_document(kind, &stored.id, &stored.data))
            .collect())
    }

    /// Persists a new application and returns it with its store-assigned id.
    pub async fn insert_application(
        &self,
        mut application: Application,
    ) -> Result<Application, RepositoryError> {
        let document = new_application_document(&application);
        let id = self
            .store
            .create(application.kind.applications(), document)
            .await?;
        application.id = ApplicationId(id);
        Ok(application)
    }

    /// Adds `posting_id` to the student's applied set unless it is already present.
    pub async fn append_applied(
        &self,
        student: &StudentProfile,
        kind: PostingKind,
        posting_id: &PostingId,
    ) -> Result<(), RepositoryError> {
        if student.has_applied(kind, posting_id) {
            return Ok(());
        }
        let mut applied: Vec<Value> = student
            .applied(kind)
            .iter()
            .map(|id| json!(id.0))
            .collect();
        applied.push(json!(posting_id.0));

        let mut patch = Document::new();
        patch.insert(kind.applied_field().to_string(), Value::Array(applied));
        self.store
            .update_merge(Collection::Students, &student.id.0, patch)
            .await?;
        Ok(())
    }

    /// Adds the student to a job's `applicants` set.
    pub async fn append_applicant(
        &self,
        job_id: &PostingId,
        student_id: &StudentId,
    ) -> Result<(), RepositoryError> {
        let document = self.require(Collection::Jobs, &job_id.0).await?;
        let mut applicants = string_list(document.get("applicants"));
        if applicants.contains(&student_id.0) {
            return Ok(());
        }
        applicants.push(student_id.0.clone());

        let mut patch = Document::new();
        patch.insert("applicants".to_string(), json!(applicants));
        self.store
            .update_merge(Collection::Jobs, &job_id.0, patch)
            .await?;
        Ok(())
    }

    pub async fn record_review(&self, application: &Application) -> Result<(), RepositoryError> {
        let mut patch = Document::new();
        patch.insert("status".to_string(), json!(application.status.label()));
        if let Some(reviewed_at) = application.reviewed_at {
            patch.insert("reviewedAt".to_string(), json!(reviewed_at.to_rfc3339()));
        }
        self.store
            .update_merge(application.kind.applications(), &application.id.0, patch)
            .await?;
        Ok(())
    }

    /// Writes the decision status together with the `publishedAt` stamp.
    pub async fn record_publication(
        &self,
        application: &Application,
    ) -> Result<(), RepositoryError> {
        let mut patch = Document::new();
        patch.insert("status".to_string(), json!(application.status.label()));
        if let Some(published_at) = application.published_at {
            patch.insert("publishedAt".to_string(), json!(published_at.to_rfc3339()));
        }
        self.store
            .update_merge(application.kind.applications(), &application.id.0, patch)
            .await?;
        Ok(())
    }

    /// Replaces the student's `admittedInstitutions` with `ledger` in one document write.
    pub async fn save_admissions(
        &self,
        student_id: &StudentId,
        ledger: &AdmissionLedger,
    ) -> Result<(), RepositoryError> {
        let mut patch = Document::new();
        patch.insert("admittedInstitutions".to_string(), ledger_to_value(ledger));
        self.store
            .update_merge(Collection::Students, &student_id.0, patch)
            .await?;
        Ok(())
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: &'static str, id: String },
    #[error("{collection}/{id} is missing required fields")]
    Malformed { collection: &'static str, id: String },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}

impl From<StoreError> for RepositoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { collection, id } => RepositoryError::NotFound { collection, id },
            StoreError::Unavailable(reason) => RepositoryError::Unavailable(reason),
        }
    }
}
