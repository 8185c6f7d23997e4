use crate::model::{generate_id, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BRANCH_NAME: &str = "main";

/// An isolated line of course-content development forked from a base version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseBranch {
    pub id: Id,
    pub course_id: Id,
    /// Unique within the course
    pub name: String,
    pub description: Option<String>,
    /// Branch this one was forked from; the default branch has none
    pub parent_branch_id: Option<Id>,
    /// Version the branch forked from; the default branch has none
    pub base_version_id: Option<Id>,
    /// Exactly one branch per course carries this
    pub is_default: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl CourseBranch {
    pub fn new_default(course_id: Id, created_by: String) -> Self {
        Self {
            id: generate_id(),
            course_id,
            name: DEFAULT_BRANCH_NAME.to_string(),
            description: Some("Default branch".to_string()),
            parent_branch_id: None,
            base_version_id: None,
            is_default: true,
            created_by,
            created_at: Utc::now(),
        }
    }

    pub fn new_from_version(
        course_id: Id,
        name: String,
        description: Option<String>,
        parent_branch_id: Id,
        base_version_id: Id,
        created_by: String,
    ) -> Self {
        Self {
            id: generate_id(),
            course_id,
            name,
            description,
            parent_branch_id: Some(parent_branch_id),
            base_version_id: Some(base_version_id),
            is_default: false,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// Input model for forking a new branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBranch {
    pub name: String,
    pub description: Option<String>,
    pub base_version_id: Id,
    /// Label for the draft version created at the branch tip
    pub new_version_label: String,
}
