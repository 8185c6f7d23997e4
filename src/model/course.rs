use crate::model::{generate_id, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Id,
    pub title: String,
    pub description: Option<String>,
    /// Forces the course visible/hidden on dashboards regardless of version state
    pub visibility_override: bool,
    /// The version currently live for students (always on the default branch)
    pub active_version_id: Option<Id>,
    pub default_branch_id: Id,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn new(
        title: String,
        description: Option<String>,
        default_branch_id: Id,
        created_by: String,
    ) -> Self {
        Self::new_with_id(generate_id(), title, description, default_branch_id, created_by)
    }

    pub fn new_with_id(
        id: Id,
        title: String,
        description: Option<String>,
        default_branch_id: Id,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            description,
            visibility_override: false,
            active_version_id: None,
            default_branch_id,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Input model for creating a new course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCourse {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub visibility_override: bool,
}
