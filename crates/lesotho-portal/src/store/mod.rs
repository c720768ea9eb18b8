//! Port onto the external document store that owns every portal collection.

mod memory;

pub use memory::MemoryDocumentStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Loose document payload exactly as the store holds it.
pub type Document = Map<String, Value>;

/// Collections shared by every portal role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Students,
    Institutions,
    Companies,
    Courses,
    Faculties,
    Jobs,
    Applications,
    CourseApplications,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Collection::Students => "students",
            Collection::Institutions => "institutions",
            Collection::Companies => "companies",
            Collection::Courses => "courses",
            Collection::Faculties => "faculties",
            Collection::Jobs => "jobs",
            Collection::Applications => "applications",
            Collection::CourseApplications => "courseApplications",
        }
    }
}

/// A document together with its store-assigned key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, data: Document) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Equality predicate used by [`DocumentStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// Remote document API. A single-document write either fully applies or fully fails; there
/// is no transaction spanning documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Returns documents matching every filter; an empty filter list returns the collection.
    async fn query(
        &self,
        collection: Collection,
        filters: &[FieldFilter],
    ) -> Result<Vec<StoredDocument>, StoreError>;

    async fn create(&self, collection: Collection, data: Document) -> Result<String, StoreError>;

    /// Shallow-merges `patch` into an existing document's top-level fields.
    async fn update_merge(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> Result<(), StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: &'static str, id: String },
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}
