use crate::model::{generate_id, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical lifecycle state of a course version. The `is_published` /
/// `is_active` flags exposed over the API are derived from this, never
/// stored separately, so the two representations cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    PendingReview,
    Published,
    Archived,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Draft => "draft",
            VersionStatus::PendingReview => "pending_review",
            VersionStatus::Published => "published",
            VersionStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(VersionStatus::Draft),
            "pending_review" => Some(VersionStatus::PendingReview),
            "published" => Some(VersionStatus::Published),
            "archived" => Some(VersionStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseVersion {
    pub id: Id,
    pub course_id: Id,
    pub branch_id: Id,
    /// Unique within the course
    pub version_label: String,
    pub summary: Option<String>,
    pub status: VersionStatus,
    /// Branch head marker; at most one version per branch carries it
    pub is_tip: bool,
    /// Previous tip of the same branch this version succeeded
    pub parent_version_id: Option<Id>,
    /// Version this one was forked or merged from
    pub based_on_version_id: Option<Id>,
    /// Set once the version has been folded into another branch
    pub merged_into_version_id: Option<Id>,
    /// Claim marker: the open merge request proposing this version
    pub merge_request_id: Option<Id>,
    pub created_by: String,
    pub reviewed_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseVersion {
    /// New draft tip on a branch. The caller is responsible for clearing the
    /// branch's previous tip first.
    pub fn new_draft(
        course_id: Id,
        branch_id: Id,
        version_label: String,
        summary: Option<String>,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            course_id,
            branch_id,
            version_label,
            summary,
            status: VersionStatus::Draft,
            is_tip: true,
            parent_version_id: None,
            based_on_version_id: None,
            merged_into_version_id: None,
            merge_request_id: None,
            created_by,
            reviewed_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// First version of a course: goes live immediately since there is no
    /// current version to unseat.
    pub fn new_published(
        course_id: Id,
        branch_id: Id,
        version_label: String,
        summary: Option<String>,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            status: VersionStatus::Published,
            approved_at: Some(now),
            ..Self::new_draft(course_id, branch_id, version_label, summary, created_by)
        }
    }

    /// Published or archived: the version has been through approval at some
    /// point. Archived versions keep this as a provenance marker.
    pub fn is_published(&self) -> bool {
        matches!(
            self.status,
            VersionStatus::Published | VersionStatus::Archived
        )
    }

    /// The live version of its branch
    pub fn is_active(&self) -> bool {
        self.status == VersionStatus::Published
    }

    pub fn is_merged(&self) -> bool {
        self.merged_into_version_id.is_some()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_derive_from_status() {
        let mut v = CourseVersion::new_draft(
            "course-1".to_string(),
            "branch-1".to_string(),
            "v1.0.0".to_string(),
            None,
            "alice".to_string(),
        );
        assert!(!v.is_published());
        assert!(!v.is_active());
        assert!(v.is_tip);

        v.status = VersionStatus::Published;
        assert!(v.is_published());
        assert!(v.is_active());

        v.status = VersionStatus::Archived;
        assert!(v.is_published(), "archived keeps publication provenance");
        assert!(!v.is_active());
    }

    #[test]
    fn initial_version_is_live() {
        let v = CourseVersion::new_published(
            "course-1".to_string(),
            "branch-1".to_string(),
            "v1.0.0".to_string(),
            Some("first".to_string()),
            "alice".to_string(),
        );
        assert_eq!(v.status, VersionStatus::Published);
        assert!(v.approved_at.is_some());
        assert!(v.is_tip);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            VersionStatus::Draft,
            VersionStatus::PendingReview,
            VersionStatus::Published,
            VersionStatus::Archived,
        ] {
            assert_eq!(VersionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(VersionStatus::parse("bogus"), None);
    }
}
