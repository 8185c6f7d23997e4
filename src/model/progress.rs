use crate::model::{generate_id, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per (student, topic), created on first interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProgress {
    pub id: Id,
    pub student_id: Id,
    pub topic_id: Id,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed_at: DateTime<Utc>,
}

impl StudentProgress {
    pub fn new(student_id: Id, topic_id: Id) -> Self {
        Self {
            id: generate_id(),
            student_id,
            topic_id,
            completed: false,
            completed_at: None,
            last_accessed_at: Utc::now(),
        }
    }

    pub fn record_access(&mut self) {
        self.last_accessed_at = Utc::now();
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        self.completed_at = if completed { Some(Utc::now()) } else { None };
        self.last_accessed_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_toggles_timestamp() {
        let mut progress = StudentProgress::new("student-1".to_string(), "topic-1".to_string());
        assert!(!progress.completed);
        assert!(progress.completed_at.is_none());

        progress.set_completed(true);
        assert!(progress.completed);
        assert!(progress.completed_at.is_some());

        progress.set_completed(false);
        assert!(!progress.completed);
        assert!(progress.completed_at.is_none());
    }
}
