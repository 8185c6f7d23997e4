use crate::error::{DomainError, DomainResult};
use crate::logic::ordering::OrderingService;
use crate::model::{
    CourseResource, CourseTopic, Id, NewEditorAssignment, NewResource, NewTopic, ResourcePatch,
    StudentProgress, TopicPatch, VersionEditor,
};
use crate::store::traits::Store;

/// Topic, resource, progress, and staff-assignment management for a course
/// version. Write operations refuse versions that have already been merged;
/// deletions re-normalize the display order of the surviving siblings.
pub struct ContentOperations;

impl ContentOperations {
    pub async fn create_topic<S: Store>(
        store: &S,
        version_id: &Id,
        input: NewTopic,
    ) -> DomainResult<CourseTopic> {
        let version = store
            .get_version(version_id)
            .await?
            .ok_or_else(|| DomainError::not_found("version", version_id))?;
        if version.is_merged() {
            return Err(DomainError::InvalidTransition(format!(
                "version '{}' has been merged and no longer accepts content",
                version.id
            )));
        }
        if input.title.trim().is_empty() {
            return Err(DomainError::ConstraintViolation(
                "topic title must not be empty".to_string(),
            ));
        }

        let order_index = match input.order_index {
            Some(order) => order,
            None => OrderingService::next_topic_order(store, version_id).await?,
        };
        let topic = CourseTopic::new(
            version_id.clone(),
            input.title,
            input.description,
            order_index,
        );
        store.upsert_topic(topic.clone()).await?;
        Ok(topic)
    }

    pub async fn update_topic<S: Store>(
        store: &S,
        topic_id: &Id,
        patch: TopicPatch,
    ) -> DomainResult<CourseTopic> {
        let mut topic = store
            .get_topic(topic_id)
            .await?
            .ok_or_else(|| DomainError::not_found("topic", topic_id))?;
        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(DomainError::ConstraintViolation(
                    "topic title must not be empty".to_string(),
                ));
            }
            topic.title = title;
        }
        if let Some(description) = patch.description {
            topic.description = Some(description);
        }
        topic.touch();
        store.upsert_topic(topic.clone()).await?;
        Ok(topic)
    }

    /// Hard delete. Resources and progress rows go with the topic, then the
    /// version's remaining topics are renumbered to a dense 1..n.
    pub async fn delete_topic<S: Store>(store: &S, topic_id: &Id) -> DomainResult<()> {
        let topic = store
            .get_topic(topic_id)
            .await?
            .ok_or_else(|| DomainError::not_found("topic", topic_id))?;
        store.delete_topic(topic_id).await?;
        OrderingService::normalize_topic_order(store, &topic.course_version_id).await
    }

    pub async fn create_resource<S: Store>(
        store: &S,
        topic_id: &Id,
        input: NewResource,
    ) -> DomainResult<CourseResource> {
        store
            .get_topic(topic_id)
            .await?
            .ok_or_else(|| DomainError::not_found("topic", topic_id))?;
        if input.title.trim().is_empty() {
            return Err(DomainError::ConstraintViolation(
                "resource title must not be empty".to_string(),
            ));
        }

        let order_index = match input.order_index {
            Some(order) => order,
            None => OrderingService::next_resource_order(store, topic_id).await?,
        };
        let resource = CourseResource::new(
            topic_id.clone(),
            input.title,
            input.description,
            input.resource_type,
            input.content,
            order_index,
        );
        store.upsert_resource(resource.clone()).await?;
        Ok(resource)
    }

    pub async fn update_resource<S: Store>(
        store: &S,
        resource_id: &Id,
        patch: ResourcePatch,
    ) -> DomainResult<CourseResource> {
        let mut resource = store
            .get_resource(resource_id)
            .await?
            .ok_or_else(|| DomainError::not_found("resource", resource_id))?;
        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(DomainError::ConstraintViolation(
                    "resource title must not be empty".to_string(),
                ));
            }
            resource.title = title;
        }
        if let Some(description) = patch.description {
            resource.description = Some(description);
        }
        if let Some(resource_type) = patch.resource_type {
            resource.resource_type = resource_type;
        }
        if let Some(content) = patch.content {
            resource.content = content;
        }
        resource.touch();
        store.upsert_resource(resource.clone()).await?;
        Ok(resource)
    }

    pub async fn delete_resource<S: Store>(store: &S, resource_id: &Id) -> DomainResult<()> {
        let resource = store
            .get_resource(resource_id)
            .await?
            .ok_or_else(|| DomainError::not_found("resource", resource_id))?;
        store.delete_resource(resource_id).await?;
        OrderingService::normalize_resource_order(store, &resource.topic_id).await
    }

    /// Deep copy of one version's topics and resources into another:
    /// fresh row ids, preserved order, no shared rows. Used by branch
    /// creation, draft creation, and merge.
    pub async fn clone_version_content<S: Store>(
        store: &S,
        from_version_id: &Id,
        to_version_id: &Id,
    ) -> DomainResult<(usize, usize)> {
        let topics = store.list_topics_for_version(from_version_id).await?;
        let mut cloned_topics = 0;
        let mut cloned_resources = 0;
        for topic in &topics {
            let copy = topic.duplicate_into(to_version_id.clone());
            let new_topic_id = copy.id.clone();
            store.upsert_topic(copy).await?;
            cloned_topics += 1;

            for resource in store.list_resources_for_topic(&topic.id).await? {
                store
                    .upsert_resource(resource.duplicate_into(new_topic_id.clone()))
                    .await?;
                cloned_resources += 1;
            }
        }
        Ok((cloned_topics, cloned_resources))
    }

    /// Upsert the (student, topic) progress row, bumping last_accessed_at
    pub async fn record_topic_access<S: Store>(
        store: &S,
        student_id: &Id,
        topic_id: &Id,
    ) -> DomainResult<StudentProgress> {
        store
            .get_topic(topic_id)
            .await?
            .ok_or_else(|| DomainError::not_found("topic", topic_id))?;
        let mut progress = match store.get_progress(student_id, topic_id).await? {
            Some(existing) => existing,
            None => StudentProgress::new(student_id.clone(), topic_id.clone()),
        };
        progress.record_access();
        store.upsert_progress(progress.clone()).await?;
        Ok(progress)
    }

    pub async fn set_topic_completion<S: Store>(
        store: &S,
        student_id: &Id,
        topic_id: &Id,
        completed: bool,
    ) -> DomainResult<StudentProgress> {
        store
            .get_topic(topic_id)
            .await?
            .ok_or_else(|| DomainError::not_found("topic", topic_id))?;
        let mut progress = match store.get_progress(student_id, topic_id).await? {
            Some(existing) => existing,
            None => StudentProgress::new(student_id.clone(), topic_id.clone()),
        };
        progress.set_completed(completed);
        store.upsert_progress(progress.clone()).await?;
        Ok(progress)
    }

    pub async fn assign_editor<S: Store>(
        store: &S,
        version_id: &Id,
        input: NewEditorAssignment,
    ) -> DomainResult<VersionEditor> {
        store
            .get_version(version_id)
            .await?
            .ok_or_else(|| DomainError::not_found("version", version_id))?;
        let existing = store.list_editors_for_version(version_id).await?;
        if existing.iter().any(|e| e.user_id == input.user_id) {
            return Err(DomainError::ConstraintViolation(format!(
                "user '{}' is already assigned to version '{}'",
                input.user_id, version_id
            )));
        }
        let assignment = VersionEditor::new(version_id.clone(), input.user_id, input.role);
        store.upsert_editor_assignment(assignment.clone()).await?;
        Ok(assignment)
    }

    pub async fn remove_editor<S: Store>(store: &S, assignment_id: &Id) -> DomainResult<()> {
        if !store.delete_editor_assignment(assignment_id).await? {
            return Err(DomainError::not_found("editor assignment", assignment_id));
        }
        Ok(())
    }
}
