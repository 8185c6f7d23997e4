use crate::model::{generate_id, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Pdf,
    Document,
    Image,
    Audio,
    Video,
    Link,
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Pdf => "pdf",
            ResourceType::Document => "document",
            ResourceType::Image => "image",
            ResourceType::Audio => "audio",
            ResourceType::Video => "video",
            ResourceType::Link => "link",
            ResourceType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pdf" => Some(ResourceType::Pdf),
            "document" => Some(ResourceType::Document),
            "image" => Some(ResourceType::Image),
            "audio" => Some(ResourceType::Audio),
            "video" => Some(ResourceType::Video),
            "link" => Some(ResourceType::Link),
            "other" => Some(ResourceType::Other),
            _ => None,
        }
    }
}

/// A resource is backed by an uploaded file or by an external link, never
/// both; the enum makes the exclusivity structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceContent {
    File {
        url: String,
        name: String,
        size_bytes: i64,
        mime_type: String,
    },
    Link {
        url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseResource {
    pub id: Id,
    pub topic_id: Id,
    pub title: String,
    pub description: Option<String>,
    pub resource_type: ResourceType,
    pub content: ResourceContent,
    /// 1-based display position within the topic
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseResource {
    pub fn new(
        topic_id: Id,
        title: String,
        description: Option<String>,
        resource_type: ResourceType,
        content: ResourceContent,
        order_index: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            topic_id,
            title,
            description,
            resource_type,
            content,
            order_index,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fresh copy of this resource under another topic, preserving its position.
    pub fn duplicate_into(&self, topic_id: Id) -> Self {
        Self::new(
            topic_id,
            self.title.clone(),
            self.description.clone(),
            self.resource_type,
            self.content.clone(),
            self.order_index,
        )
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Input model for creating a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResource {
    pub title: String,
    pub description: Option<String>,
    pub resource_type: ResourceType,
    pub content: ResourceContent,
    /// Assigned to the end of the topic when absent
    pub order_index: Option<i32>,
}

/// Partial update for a resource; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub resource_type: Option<ResourceType>,
    pub content: Option<ResourceContent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_serializes_tagged() {
        let link = ResourceContent::Link {
            url: "https://example.org/syllabus".to_string(),
        };
        let json = serde_json::to_string(&link).unwrap();
        assert!(json.contains("\"kind\":\"link\""));

        let file: ResourceContent = serde_json::from_str(
            r#"{"kind":"file","url":"s3://bucket/a.pdf","name":"a.pdf","size_bytes":1024,"mime_type":"application/pdf"}"#,
        )
        .unwrap();
        match file {
            ResourceContent::File { size_bytes, .. } => assert_eq!(size_bytes, 1024),
            other => panic!("expected file content, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_gets_fresh_id() {
        let original = CourseResource::new(
            "topic-1".to_string(),
            "Lecture notes".to_string(),
            None,
            ResourceType::Pdf,
            ResourceContent::Link {
                url: "https://example.org/notes.pdf".to_string(),
            },
            3,
        );
        let copy = original.duplicate_into("topic-2".to_string());
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.topic_id, "topic-2");
        assert_eq!(copy.order_index, 3);
        assert_eq!(copy.content, original.content);
    }
}
