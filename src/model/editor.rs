use crate::model::{generate_id, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorRole {
    Teacher,
    Editor,
}

impl EditorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorRole::Teacher => "teacher",
            EditorRole::Editor => "editor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "teacher" => Some(EditorRole::Teacher),
            "editor" => Some(EditorRole::Editor),
            _ => None,
        }
    }
}

/// Staff assignment scoped to a single course version; deleted together
/// with the version when a branch is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEditor {
    pub id: Id,
    pub course_version_id: Id,
    pub user_id: Id,
    pub role: EditorRole,
    pub assigned_at: DateTime<Utc>,
}

impl VersionEditor {
    pub fn new(course_version_id: Id, user_id: Id, role: EditorRole) -> Self {
        Self {
            id: generate_id(),
            course_version_id,
            user_id,
            role,
            assigned_at: Utc::now(),
        }
    }
}

/// Input model for assigning an editor to a version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEditorAssignment {
    pub user_id: Id,
    pub role: EditorRole,
}
