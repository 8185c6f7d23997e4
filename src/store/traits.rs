use crate::model::{
    Course, CourseBranch, CourseResource, CourseTopic, CourseVersion, Id, MergeRequest,
    StudentProgress, VersionEditor,
};
use anyhow::Result;

#[async_trait::async_trait]
pub trait CourseStore: Send + Sync {
    async fn get_course(&self, id: &Id) -> Result<Option<Course>>;
    async fn list_courses(&self) -> Result<Vec<Course>>;
    async fn upsert_course(&self, course: Course) -> Result<()>;
    async fn delete_course(&self, id: &Id) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait BranchStore: Send + Sync {
    async fn get_branch(&self, id: &Id) -> Result<Option<CourseBranch>>;
    async fn list_branches_for_course(&self, course_id: &Id) -> Result<Vec<CourseBranch>>;
    async fn get_default_branch(&self, course_id: &Id) -> Result<Option<CourseBranch>>;
    async fn upsert_branch(&self, branch: CourseBranch) -> Result<()>;
    async fn delete_branch(&self, id: &Id) -> Result<bool>;
    /// Create a branch together with its tip version in one transaction.
    /// The two rows either both exist afterwards or neither does.
    async fn create_branch_with_version(
        &self,
        branch: CourseBranch,
        version: CourseVersion,
    ) -> Result<()>;
}

#[async_trait::async_trait]
pub trait VersionStore: Send + Sync {
    async fn get_version(&self, id: &Id) -> Result<Option<CourseVersion>>;
    async fn list_versions_for_course(&self, course_id: &Id) -> Result<Vec<CourseVersion>>;
    async fn list_versions_for_branch(&self, branch_id: &Id) -> Result<Vec<CourseVersion>>;
    /// The version carrying the tip marker for a branch, if any
    async fn get_tip_version(&self, branch_id: &Id) -> Result<Option<CourseVersion>>;
    async fn upsert_version(&self, version: CourseVersion) -> Result<()>;
    async fn delete_version(&self, id: &Id) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait MergeRequestStore: Send + Sync {
    async fn get_merge_request(&self, id: &Id) -> Result<Option<MergeRequest>>;
    async fn list_merge_requests_for_course(&self, course_id: &Id) -> Result<Vec<MergeRequest>>;
    async fn upsert_merge_request(&self, request: MergeRequest) -> Result<()>;
}

#[async_trait::async_trait]
pub trait TopicStore: Send + Sync {
    async fn get_topic(&self, id: &Id) -> Result<Option<CourseTopic>>;
    /// Topics of a version ordered by order_index
    async fn list_topics_for_version(&self, version_id: &Id) -> Result<Vec<CourseTopic>>;
    async fn upsert_topic(&self, topic: CourseTopic) -> Result<()>;
    /// Deletes the topic along with its resources and progress rows
    async fn delete_topic(&self, id: &Id) -> Result<bool>;
    /// Atomic multi-row reorder; all positions change or none do. The
    /// ordering service falls back to `set_topic_order` per item when this
    /// path fails.
    async fn reorder_topics_batch(
        &self,
        version_id: &Id,
        topic_ids: &[Id],
        order_indices: &[i32],
    ) -> Result<()>;
    async fn set_topic_order(&self, topic_id: &Id, order_index: i32) -> Result<()>;
}

#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_resource(&self, id: &Id) -> Result<Option<CourseResource>>;
    /// Resources of a topic ordered by order_index
    async fn list_resources_for_topic(&self, topic_id: &Id) -> Result<Vec<CourseResource>>;
    async fn upsert_resource(&self, resource: CourseResource) -> Result<()>;
    async fn delete_resource(&self, id: &Id) -> Result<bool>;
    /// Atomic counterpart of `reorder_topics_batch` for resources
    async fn reorder_resources_batch(
        &self,
        topic_id: &Id,
        resource_ids: &[Id],
        order_indices: &[i32],
    ) -> Result<()>;
    async fn set_resource_order(&self, resource_id: &Id, order_index: i32) -> Result<()>;
}

#[async_trait::async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get_progress(&self, student_id: &Id, topic_id: &Id)
        -> Result<Option<StudentProgress>>;
    async fn list_progress_for_student(&self, student_id: &Id) -> Result<Vec<StudentProgress>>;
    async fn list_progress_for_topic(&self, topic_id: &Id) -> Result<Vec<StudentProgress>>;
    async fn upsert_progress(&self, progress: StudentProgress) -> Result<()>;
    async fn delete_progress_for_topic(&self, topic_id: &Id) -> Result<u64>;
}

#[async_trait::async_trait]
pub trait EditorStore: Send + Sync {
    async fn get_editor_assignment(&self, id: &Id) -> Result<Option<VersionEditor>>;
    async fn list_editors_for_version(&self, version_id: &Id) -> Result<Vec<VersionEditor>>;
    async fn upsert_editor_assignment(&self, assignment: VersionEditor) -> Result<()>;
    async fn delete_editor_assignment(&self, id: &Id) -> Result<bool>;
    async fn delete_editors_for_version(&self, version_id: &Id) -> Result<u64>;
}

pub trait Store:
    CourseStore
    + BranchStore
    + VersionStore
    + MergeRequestStore
    + TopicStore
    + ResourceStore
    + ProgressStore
    + EditorStore
    + Send
    + Sync
{
}
