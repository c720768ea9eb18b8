use serde::{Deserialize, Serialize};

use super::domain::{Posting, PostingKind, StudentId};

/// Portal roles, each signing in through its own flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalRole {
    Student,
    Institution,
    Company,
    Admin,
}

impl PortalRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(PortalRole::Student),
            "institution" | "institute" => Some(PortalRole::Institution),
            "company" => Some(PortalRole::Company),
            "admin" => Some(PortalRole::Admin),
            _ => None,
        }
    }
}

/// Authenticated caller, passed explicitly into every service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalSession {
    pub user_id: String,
    pub role: PortalRole,
}

impl PortalSession {
    pub fn new(user_id: impl Into<String>, role: PortalRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn student(user_id: impl Into<String>) -> Self {
        Self::new(user_id, PortalRole::Student)
    }

    pub fn institution(user_id: impl Into<String>) -> Self {
        Self::new(user_id, PortalRole::Institution)
    }

    pub fn company(user_id: impl Into<String>) -> Self {
        Self::new(user_id, PortalRole::Company)
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, PortalRole::Admin)
    }

    /// Student identity when the caller is a student.
    pub fn student_id(&self) -> Option<StudentId> {
        (self.role == PortalRole::Student).then(|| StudentId(self.user_id.clone()))
    }

    /// Institutions review courses, companies review jobs, admins review both.
    pub fn reviews(&self, kind: PostingKind) -> bool {
        matches!(
            (self.role, kind),
            (PortalRole::Admin, _)
                | (PortalRole::Institution, PostingKind::Course)
                | (PortalRole::Company, PostingKind::Job)
        )
    }

    /// Whether this caller may review and publish decisions for `posting`.
    pub fn may_review(&self, posting: &Posting) -> bool {
        if !self.reviews(posting.kind) {
            return false;
        }
        self.role == PortalRole::Admin || posting.owner_id.as_deref() == Some(self.user_id.as_str())
    }
}
