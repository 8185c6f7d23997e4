use crate::model::{generate_id, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ordered unit of course content within a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseTopic {
    pub id: Id,
    pub course_version_id: Id,
    pub title: String,
    pub description: Option<String>,
    /// 1-based display position within the version
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseTopic {
    pub fn new(
        course_version_id: Id,
        title: String,
        description: Option<String>,
        order_index: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            course_version_id,
            title,
            description,
            order_index,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fresh copy of this topic under another version, preserving its position.
    pub fn duplicate_into(&self, course_version_id: Id) -> Self {
        Self::new(
            course_version_id,
            self.title.clone(),
            self.description.clone(),
            self.order_index,
        )
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Input model for creating a topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTopic {
    pub title: String,
    pub description: Option<String>,
    /// Assigned to the end of the version when absent
    pub order_index: Option<i32>,
}

/// Partial update for a topic; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// One entry of a batch reorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAssignment {
    pub id: Id,
    pub order_index: i32,
}
