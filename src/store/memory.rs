use crate::model::{
    Course, CourseBranch, CourseResource, CourseTopic, CourseVersion, Id, MergeRequest,
    StudentProgress, VersionEditor,
};
use crate::store::traits::{
    BranchStore, CourseStore, EditorStore, MergeRequestStore, ProgressStore, ResourceStore, Store,
    TopicStore, VersionStore,
};
use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct MemoryInner {
    courses: HashMap<Id, Course>,
    branches: HashMap<Id, CourseBranch>,
    versions: HashMap<Id, CourseVersion>,
    merge_requests: HashMap<Id, MergeRequest>,
    topics: HashMap<Id, CourseTopic>,
    resources: HashMap<Id, CourseResource>,
    progress: HashMap<Id, StudentProgress>,
    editors: HashMap<Id, VersionEditor>,
}

/// In-memory store backing tests and local development. Mirrors the
/// referential rules the SQL schema enforces with ON DELETE CASCADE.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CourseStore for MemoryStore {
    async fn get_course(&self, id: &Id) -> Result<Option<Course>> {
        Ok(self.inner.read().courses.get(id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let inner = self.inner.read();
        let mut courses: Vec<Course> = inner.courses.values().cloned().collect();
        courses.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(courses)
    }

    async fn upsert_course(&self, course: Course) -> Result<()> {
        self.inner.write().courses.insert(course.id.clone(), course);
        Ok(())
    }

    async fn delete_course(&self, id: &Id) -> Result<bool> {
        let mut inner = self.inner.write();
        if inner.courses.remove(id).is_none() {
            return Ok(false);
        }
        let version_ids: Vec<Id> = inner
            .versions
            .values()
            .filter(|v| &v.course_id == id)
            .map(|v| v.id.clone())
            .collect();
        let topic_ids: Vec<Id> = inner
            .topics
            .values()
            .filter(|t| version_ids.contains(&t.course_version_id))
            .map(|t| t.id.clone())
            .collect();
        inner
            .resources
            .retain(|_, r| !topic_ids.contains(&r.topic_id));
        inner
            .progress
            .retain(|_, p| !topic_ids.contains(&p.topic_id));
        inner
            .editors
            .retain(|_, e| !version_ids.contains(&e.course_version_id));
        inner
            .topics
            .retain(|_, t| !version_ids.contains(&t.course_version_id));
        inner.versions.retain(|_, v| &v.course_id != id);
        inner.branches.retain(|_, b| &b.course_id != id);
        inner.merge_requests.retain(|_, m| &m.course_id != id);
        Ok(true)
    }
}

#[async_trait::async_trait]
impl BranchStore for MemoryStore {
    async fn get_branch(&self, id: &Id) -> Result<Option<CourseBranch>> {
        Ok(self.inner.read().branches.get(id).cloned())
    }

    async fn list_branches_for_course(&self, course_id: &Id) -> Result<Vec<CourseBranch>> {
        let inner = self.inner.read();
        let mut branches: Vec<CourseBranch> = inner
            .branches
            .values()
            .filter(|b| &b.course_id == course_id)
            .cloned()
            .collect();
        branches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(branches)
    }

    async fn get_default_branch(&self, course_id: &Id) -> Result<Option<CourseBranch>> {
        Ok(self
            .inner
            .read()
            .branches
            .values()
            .find(|b| &b.course_id == course_id && b.is_default)
            .cloned())
    }

    async fn upsert_branch(&self, branch: CourseBranch) -> Result<()> {
        self.inner.write().branches.insert(branch.id.clone(), branch);
        Ok(())
    }

    async fn delete_branch(&self, id: &Id) -> Result<bool> {
        Ok(self.inner.write().branches.remove(id).is_some())
    }

    async fn create_branch_with_version(
        &self,
        branch: CourseBranch,
        version: CourseVersion,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        if inner
            .branches
            .values()
            .any(|b| b.course_id == branch.course_id && b.name == branch.name)
        {
            return Err(anyhow!(
                "branch '{}' already exists for course '{}'",
                branch.name,
                branch.course_id
            ));
        }
        inner.branches.insert(branch.id.clone(), branch);
        inner.versions.insert(version.id.clone(), version);
        Ok(())
    }
}

#[async_trait::async_trait]
impl VersionStore for MemoryStore {
    async fn get_version(&self, id: &Id) -> Result<Option<CourseVersion>> {
        Ok(self.inner.read().versions.get(id).cloned())
    }

    async fn list_versions_for_course(&self, course_id: &Id) -> Result<Vec<CourseVersion>> {
        let inner = self.inner.read();
        let mut versions: Vec<CourseVersion> = inner
            .versions
            .values()
            .filter(|v| &v.course_id == course_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(versions)
    }

    async fn list_versions_for_branch(&self, branch_id: &Id) -> Result<Vec<CourseVersion>> {
        let inner = self.inner.read();
        let mut versions: Vec<CourseVersion> = inner
            .versions
            .values()
            .filter(|v| &v.branch_id == branch_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(versions)
    }

    async fn get_tip_version(&self, branch_id: &Id) -> Result<Option<CourseVersion>> {
        Ok(self
            .inner
            .read()
            .versions
            .values()
            .find(|v| &v.branch_id == branch_id && v.is_tip)
            .cloned())
    }

    async fn upsert_version(&self, version: CourseVersion) -> Result<()> {
        self.inner.write().versions.insert(version.id.clone(), version);
        Ok(())
    }

    async fn delete_version(&self, id: &Id) -> Result<bool> {
        Ok(self.inner.write().versions.remove(id).is_some())
    }
}

#[async_trait::async_trait]
impl MergeRequestStore for MemoryStore {
    async fn get_merge_request(&self, id: &Id) -> Result<Option<MergeRequest>> {
        Ok(self.inner.read().merge_requests.get(id).cloned())
    }

    async fn list_merge_requests_for_course(&self, course_id: &Id) -> Result<Vec<MergeRequest>> {
        let inner = self.inner.read();
        let mut requests: Vec<MergeRequest> = inner
            .merge_requests
            .values()
            .filter(|m| &m.course_id == course_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        Ok(requests)
    }

    async fn upsert_merge_request(&self, request: MergeRequest) -> Result<()> {
        self.inner
            .write()
            .merge_requests
            .insert(request.id.clone(), request);
        Ok(())
    }
}

#[async_trait::async_trait]
impl TopicStore for MemoryStore {
    async fn get_topic(&self, id: &Id) -> Result<Option<CourseTopic>> {
        Ok(self.inner.read().topics.get(id).cloned())
    }

    async fn list_topics_for_version(&self, version_id: &Id) -> Result<Vec<CourseTopic>> {
        let inner = self.inner.read();
        let mut topics: Vec<CourseTopic> = inner
            .topics
            .values()
            .filter(|t| &t.course_version_id == version_id)
            .cloned()
            .collect();
        topics.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(topics)
    }

    async fn upsert_topic(&self, topic: CourseTopic) -> Result<()> {
        self.inner.write().topics.insert(topic.id.clone(), topic);
        Ok(())
    }

    async fn delete_topic(&self, id: &Id) -> Result<bool> {
        let mut inner = self.inner.write();
        if inner.topics.remove(id).is_none() {
            return Ok(false);
        }
        inner.resources.retain(|_, r| &r.topic_id != id);
        inner.progress.retain(|_, p| &p.topic_id != id);
        Ok(true)
    }

    async fn reorder_topics_batch(
        &self,
        version_id: &Id,
        topic_ids: &[Id],
        order_indices: &[i32],
    ) -> Result<()> {
        if topic_ids.len() != order_indices.len() {
            return Err(anyhow!("reorder batch id/index length mismatch"));
        }
        let mut inner = self.inner.write();
        for id in topic_ids {
            match inner.topics.get(id) {
                Some(topic) if &topic.course_version_id == version_id => {}
                Some(_) => return Err(anyhow!("topic '{}' belongs to another version", id)),
                None => return Err(anyhow!("topic '{}' not found", id)),
            }
        }
        for (id, order) in topic_ids.iter().zip(order_indices) {
            if let Some(topic) = inner.topics.get_mut(id) {
                topic.order_index = *order;
                topic.touch();
            }
        }
        Ok(())
    }

    async fn set_topic_order(&self, topic_id: &Id, order_index: i32) -> Result<()> {
        let mut inner = self.inner.write();
        let topic = inner
            .topics
            .get_mut(topic_id)
            .ok_or_else(|| anyhow!("topic '{}' not found", topic_id))?;
        topic.order_index = order_index;
        topic.touch();
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceStore for MemoryStore {
    async fn get_resource(&self, id: &Id) -> Result<Option<CourseResource>> {
        Ok(self.inner.read().resources.get(id).cloned())
    }

    async fn list_resources_for_topic(&self, topic_id: &Id) -> Result<Vec<CourseResource>> {
        let inner = self.inner.read();
        let mut resources: Vec<CourseResource> = inner
            .resources
            .values()
            .filter(|r| &r.topic_id == topic_id)
            .cloned()
            .collect();
        resources.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(resources)
    }

    async fn upsert_resource(&self, resource: CourseResource) -> Result<()> {
        self.inner
            .write()
            .resources
            .insert(resource.id.clone(), resource);
        Ok(())
    }

    async fn delete_resource(&self, id: &Id) -> Result<bool> {
        Ok(self.inner.write().resources.remove(id).is_some())
    }

    async fn reorder_resources_batch(
        &self,
        topic_id: &Id,
        resource_ids: &[Id],
        order_indices: &[i32],
    ) -> Result<()> {
        if resource_ids.len() != order_indices.len() {
            return Err(anyhow!("reorder batch id/index length mismatch"));
        }
        let mut inner = self.inner.write();
        for id in resource_ids {
            match inner.resources.get(id) {
                Some(resource) if &resource.topic_id == topic_id => {}
                Some(_) => return Err(anyhow!("resource '{}' belongs to another topic", id)),
                None => return Err(anyhow!("resource '{}' not found", id)),
            }
        }
        for (id, order) in resource_ids.iter().zip(order_indices) {
            if let Some(resource) = inner.resources.get_mut(id) {
                resource.order_index = *order;
                resource.touch();
            }
        }
        Ok(())
    }

    async fn set_resource_order(&self, resource_id: &Id, order_index: i32) -> Result<()> {
        let mut inner = self.inner.write();
        let resource = inner
            .resources
            .get_mut(resource_id)
            .ok_or_else(|| anyhow!("resource '{}' not found", resource_id))?;
        resource.order_index = order_index;
        resource.touch();
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProgressStore for MemoryStore {
    async fn get_progress(
        &self,
        student_id: &Id,
        topic_id: &Id,
    ) -> Result<Option<StudentProgress>> {
        Ok(self
            .inner
            .read()
            .progress
            .values()
            .find(|p| &p.student_id == student_id && &p.topic_id == topic_id)
            .cloned())
    }

    async fn list_progress_for_student(&self, student_id: &Id) -> Result<Vec<StudentProgress>> {
        let inner = self.inner.read();
        let mut rows: Vec<StudentProgress> = inner
            .progress
            .values()
            .filter(|p| &p.student_id == student_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.last_accessed_at.cmp(&b.last_accessed_at));
        Ok(rows)
    }

    async fn list_progress_for_topic(&self, topic_id: &Id) -> Result<Vec<StudentProgress>> {
        Ok(self
            .inner
            .read()
            .progress
            .values()
            .filter(|p| &p.topic_id == topic_id)
            .cloned()
            .collect())
    }

    async fn upsert_progress(&self, progress: StudentProgress) -> Result<()> {
        self.inner
            .write()
            .progress
            .insert(progress.id.clone(), progress);
        Ok(())
    }

    async fn delete_progress_for_topic(&self, topic_id: &Id) -> Result<u64> {
        let mut inner = self.inner.write();
        let before = inner.progress.len();
        inner.progress.retain(|_, p| &p.topic_id != topic_id);
        Ok((before - inner.progress.len()) as u64)
    }
}

#[async_trait::async_trait]
impl EditorStore for MemoryStore {
    async fn get_editor_assignment(&self, id: &Id) -> Result<Option<VersionEditor>> {
        Ok(self.inner.read().editors.get(id).cloned())
    }

    async fn list_editors_for_version(&self, version_id: &Id) -> Result<Vec<VersionEditor>> {
        let inner = self.inner.read();
        let mut assignments: Vec<VersionEditor> = inner
            .editors
            .values()
            .filter(|e| &e.course_version_id == version_id)
            .cloned()
            .collect();
        assignments.sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at));
        Ok(assignments)
    }

    async fn upsert_editor_assignment(&self, assignment: VersionEditor) -> Result<()> {
        self.inner
            .write()
            .editors
            .insert(assignment.id.clone(), assignment);
        Ok(())
    }

    async fn delete_editor_assignment(&self, id: &Id) -> Result<bool> {
        Ok(self.inner.write().editors.remove(id).is_some())
    }

    async fn delete_editors_for_version(&self, version_id: &Id) -> Result<u64> {
        let mut inner = self.inner.write();
        let before = inner.editors.len();
        inner.editors.retain(|_, e| &e.course_version_id != version_id);
        Ok((before - inner.editors.len()) as u64)
    }
}

impl Store for MemoryStore {}
