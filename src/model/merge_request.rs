use crate::model::{generate_id, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRequestStatus {
    Open,
    Approved,
    Merged,
    Rejected,
}

impl MergeRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeRequestStatus::Open => "open",
            MergeRequestStatus::Approved => "approved",
            MergeRequestStatus::Merged => "merged",
            MergeRequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(MergeRequestStatus::Open),
            "approved" => Some(MergeRequestStatus::Approved),
            "merged" => Some(MergeRequestStatus::Merged),
            "rejected" => Some(MergeRequestStatus::Rejected),
            _ => None,
        }
    }

    /// Merged and rejected requests accept no further operations
    pub fn is_terminal(&self) -> bool {
        matches!(self, MergeRequestStatus::Merged | MergeRequestStatus::Rejected)
    }
}

/// A proposal to fold a source branch's tip content into a target branch,
/// producing a new version on the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: Id,
    pub course_id: Id,
    pub source_branch_id: Id,
    pub target_branch_id: Id,
    /// Source branch tip at the time the request was opened
    pub source_version_id: Id,
    /// Version produced on the target branch; set when the request is merged
    pub target_version_id: Option<Id>,
    pub title: String,
    pub summary: Option<String>,
    pub status: MergeRequestStatus,
    pub opened_by: String,
    pub reviewer_id: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    /// Opaque caller-supplied context, stored verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl MergeRequest {
    pub fn open(
        course_id: Id,
        source_branch_id: Id,
        target_branch_id: Id,
        source_version_id: Id,
        title: String,
        summary: Option<String>,
        opened_by: String,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: generate_id(),
            course_id,
            source_branch_id,
            target_branch_id,
            source_version_id,
            target_version_id: None,
            title,
            summary,
            status: MergeRequestStatus::Open,
            opened_by,
            reviewer_id: None,
            opened_at: Utc::now(),
            closed_at: None,
            merged_at: None,
            payload,
        }
    }

    pub fn approve(&mut self, reviewer_id: String) {
        self.status = MergeRequestStatus::Approved;
        self.reviewer_id = Some(reviewer_id);
    }

    pub fn reject(&mut self, reviewer_id: String) {
        self.status = MergeRequestStatus::Rejected;
        self.reviewer_id = Some(reviewer_id);
        self.closed_at = Some(Utc::now());
    }

    pub fn mark_merged(&mut self, reviewer_id: String, target_version_id: Id) {
        let now = Utc::now();
        self.status = MergeRequestStatus::Merged;
        self.reviewer_id = Some(reviewer_id);
        self.target_version_id = Some(target_version_id);
        self.closed_at = Some(now);
        self.merged_at = Some(now);
    }
}

/// Reviewer verdict on an open merge request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// Input model for opening a merge request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMergeRequest {
    pub source_branch_id: Id,
    pub target_branch_id: Id,
    pub title: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}
