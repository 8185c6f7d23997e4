use crate::error::{DomainError, DomainResult};
use crate::logic::content::ContentOperations;
use crate::logic::lifecycle::VersionLifecycle;
use crate::model::{ActorContext, CourseBranch, CourseVersion, Id, NewBranch};
use crate::store::traits::Store;

/// Branch creation and deletion. Creation forks a draft tip off a base
/// version and deep-copies its content; deletion refuses branches that are
/// still load-bearing and otherwise cascades children before parents.
pub struct BranchManager;

impl BranchManager {
    pub async fn create_branch<S: Store>(
        store: &S,
        course_id: &Id,
        input: NewBranch,
        actor: &ActorContext,
    ) -> DomainResult<(CourseBranch, CourseVersion)> {
        let course = store
            .get_course(course_id)
            .await?
            .ok_or_else(|| DomainError::not_found("course", course_id))?;
        let base = store
            .get_version(&input.base_version_id)
            .await?
            .ok_or_else(|| DomainError::not_found("version", &input.base_version_id))?;
        if base.course_id != course.id {
            return Err(DomainError::ConstraintViolation(format!(
                "version '{}' does not belong to course '{}'",
                base.id, course.id
            )));
        }
        if input.name.trim().is_empty() {
            return Err(DomainError::ConstraintViolation(
                "branch name must not be empty".to_string(),
            ));
        }
        let siblings = store.list_branches_for_course(course_id).await?;
        if siblings.iter().any(|b| b.name == input.name) {
            return Err(DomainError::ConstraintViolation(format!(
                "branch '{}' already exists in course '{}'",
                input.name, course.id
            )));
        }
        VersionLifecycle::ensure_label_free(store, course_id, &input.new_version_label).await?;

        let branch = CourseBranch::new_from_version(
            course.id.clone(),
            input.name,
            input.description,
            base.branch_id.clone(),
            base.id.clone(),
            actor.user_id.clone(),
        );
        let mut version = CourseVersion::new_draft(
            course.id.clone(),
            branch.id.clone(),
            input.new_version_label,
            base.summary.clone(),
            actor.user_id.clone(),
        );
        version.based_on_version_id = Some(base.id.clone());

        // Branch and tip land together or not at all; content cloning is a
        // separate step with explicit cleanup on failure.
        store
            .create_branch_with_version(branch.clone(), version.clone())
            .await?;

        if let Err(e) = ContentOperations::clone_version_content(store, &base.id, &version.id).await
        {
            let cleanup: DomainResult<()> = async {
                store.delete_version(&version.id).await?;
                store.delete_branch(&branch.id).await?;
                Ok(())
            }
            .await;
            if let Err(cleanup_err) = cleanup {
                log::error!(
                    "branch {} (version {}) left partial after failed clone; cleanup also failed: {}",
                    branch.id,
                    version.id,
                    cleanup_err
                );
                return Err(DomainError::partial(
                    "create_branch",
                    "clone_cleanup",
                    anyhow::Error::new(e),
                ));
            }
            return Err(DomainError::partial(
                "create_branch",
                "clone_content",
                anyhow::Error::new(e),
            ));
        }
        Ok((branch, version))
    }

    /// Refuses the default branch, a branch other branches fork from, and a
    /// branch holding the course's active version. Otherwise deletes
    /// children before parents: topics (with their resources and progress),
    /// editor assignments, versions, then the branch row.
    pub async fn delete_branch<S: Store>(
        store: &S,
        course_id: &Id,
        branch_id: &Id,
    ) -> DomainResult<()> {
        let branch = store
            .get_branch(branch_id)
            .await?
            .ok_or_else(|| DomainError::not_found("branch", branch_id))?;
        if &branch.course_id != course_id {
            return Err(DomainError::not_found("branch", branch_id));
        }
        if branch.is_default {
            return Err(DomainError::ConstraintViolation(format!(
                "branch '{}' is the default branch of course '{}'",
                branch.name, course_id
            )));
        }
        let siblings = store.list_branches_for_course(course_id).await?;
        let children: Vec<&CourseBranch> = siblings
            .iter()
            .filter(|b| b.parent_branch_id.as_ref() == Some(branch_id))
            .collect();
        if !children.is_empty() {
            return Err(DomainError::ConstraintViolation(format!(
                "branch '{}' has {} derived branch(es) and cannot be deleted",
                branch.name,
                children.len()
            )));
        }

        let course = store
            .get_course(course_id)
            .await?
            .ok_or_else(|| DomainError::not_found("course", course_id))?;
        let versions = store.list_versions_for_branch(branch_id).await?;
        if let Some(active) = &course.active_version_id {
            if versions.iter().any(|v| &v.id == active) {
                return Err(DomainError::ConstraintViolation(format!(
                    "branch '{}' holds the course's active version and cannot be deleted",
                    branch.name
                )));
            }
        }

        for version in &versions {
            let topics = store
                .list_topics_for_version(&version.id)
                .await
                .map_err(|e| DomainError::partial("delete_branch", "list_topics", e))?;
            for topic in topics {
                store
                    .delete_topic(&topic.id)
                    .await
                    .map_err(|e| DomainError::partial("delete_branch", "delete_topics", e))?;
            }
            store
                .delete_editors_for_version(&version.id)
                .await
                .map_err(|e| DomainError::partial("delete_branch", "delete_editors", e))?;
            store
                .delete_version(&version.id)
                .await
                .map_err(|e| DomainError::partial("delete_branch", "delete_versions", e))?;
        }
        store
            .delete_branch(branch_id)
            .await
            .map_err(|e| DomainError::partial("delete_branch", "delete_branch_row", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::lifecycle::VersionLifecycle;
    use crate::model::{Course, CourseBranch, NewTopic};
    use crate::store::memory::MemoryStore;
    use crate::store::traits::{BranchStore, CourseStore, TopicStore, VersionStore};

    async fn seed_course_with_initial(store: &MemoryStore) -> (Id, Id, crate::model::CourseVersion)
    {
        let branch = CourseBranch::new_default("placeholder".to_string(), "alice".to_string());
        let course = Course::new(
            "Intro".to_string(),
            None,
            branch.id.clone(),
            "alice".to_string(),
        );
        let mut branch = branch;
        branch.course_id = course.id.clone();
        store.upsert_course(course.clone()).await.unwrap();
        store.upsert_branch(branch.clone()).await.unwrap();
        let initial = VersionLifecycle::create_initial_version(
            store,
            &course.id,
            "v1.0.0".to_string(),
            None,
            &ActorContext::new("alice".to_string()),
        )
        .await
        .unwrap();
        (course.id, branch.id, initial)
    }

    #[tokio::test]
    async fn branch_forks_with_cloned_content() {
        let store = MemoryStore::new();
        let (course_id, default_branch_id, initial) = seed_course_with_initial(&store).await;
        for title in ["Week 1", "Week 2", "Week 3"] {
            crate::logic::content::ContentOperations::create_topic(
                &store,
                &initial.id,
                NewTopic {
                    title: title.to_string(),
                    description: None,
                    order_index: None,
                },
            )
            .await
            .unwrap();
        }

        let (branch, version) = BranchManager::create_branch(
            &store,
            &course_id,
            NewBranch {
                name: "experimental".to_string(),
                description: None,
                base_version_id: initial.id.clone(),
                new_version_label: "v1.1.0-exp".to_string(),
            },
            &ActorContext::new("alice".to_string()),
        )
        .await
        .unwrap();

        assert!(!branch.is_default);
        assert_eq!(branch.parent_branch_id, Some(default_branch_id));
        assert_eq!(branch.base_version_id, Some(initial.id.clone()));
        assert_eq!(version.based_on_version_id, Some(initial.id));
        assert!(version.is_tip);

        let topics = store.list_topics_for_version(&version.id).await.unwrap();
        let indices: Vec<i32> = topics.iter().map(|t| t.order_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn duplicate_branch_name_is_rejected() {
        let store = MemoryStore::new();
        let (course_id, _, initial) = seed_course_with_initial(&store).await;
        let actor = ActorContext::new("alice".to_string());
        let input = NewBranch {
            name: "experimental".to_string(),
            description: None,
            base_version_id: initial.id.clone(),
            new_version_label: "v1.1.0-exp".to_string(),
        };
        BranchManager::create_branch(&store, &course_id, input.clone(), &actor)
            .await
            .unwrap();

        let err = BranchManager::create_branch(
            &store,
            &course_id,
            NewBranch {
                new_version_label: "v1.2.0-exp".to_string(),
                ..input
            },
            &actor,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DomainError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn default_branch_cannot_be_deleted() {
        let store = MemoryStore::new();
        let (course_id, default_branch_id, _) = seed_course_with_initial(&store).await;
        let err = BranchManager::delete_branch(&store, &course_id, &default_branch_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn branch_with_children_cannot_be_deleted() {
        let store = MemoryStore::new();
        let (course_id, _, initial) = seed_course_with_initial(&store).await;
        let actor = ActorContext::new("alice".to_string());
        let (parent, parent_version) = BranchManager::create_branch(
            &store,
            &course_id,
            NewBranch {
                name: "experimental".to_string(),
                description: None,
                base_version_id: initial.id.clone(),
                new_version_label: "v1.1.0-exp".to_string(),
            },
            &actor,
        )
        .await
        .unwrap();
        BranchManager::create_branch(
            &store,
            &course_id,
            NewBranch {
                name: "experimental-child".to_string(),
                description: None,
                base_version_id: parent_version.id.clone(),
                new_version_label: "v1.1.1-exp".to_string(),
            },
            &actor,
        )
        .await
        .unwrap();

        let err = BranchManager::delete_branch(&store, &course_id, &parent.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConstraintViolation(_)));
        // Refusal must leave the branch intact
        assert!(store.get_branch(&parent.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deletion_cascades_versions_and_topics() {
        let store = MemoryStore::new();
        let (course_id, _, initial) = seed_course_with_initial(&store).await;
        let actor = ActorContext::new("alice".to_string());
        let (branch, version) = BranchManager::create_branch(
            &store,
            &course_id,
            NewBranch {
                name: "experimental".to_string(),
                description: None,
                base_version_id: initial.id.clone(),
                new_version_label: "v1.1.0-exp".to_string(),
            },
            &actor,
        )
        .await
        .unwrap();
        crate::logic::content::ContentOperations::create_topic(
            &store,
            &version.id,
            NewTopic {
                title: "Week 1".to_string(),
                description: None,
                order_index: None,
            },
        )
        .await
        .unwrap();

        BranchManager::delete_branch(&store, &course_id, &branch.id)
            .await
            .unwrap();

        assert!(store.get_branch(&branch.id).await.unwrap().is_none());
        assert!(store.get_version(&version.id).await.unwrap().is_none());
        assert!(store
            .list_topics_for_version(&version.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn branch_holding_active_version_cannot_be_deleted() {
        let store = MemoryStore::new();
        let (course_id, _, initial) = seed_course_with_initial(&store).await;
        let actor = ActorContext::new("alice".to_string());
        let (branch, version) = BranchManager::create_branch(
            &store,
            &course_id,
            NewBranch {
                name: "experimental".to_string(),
                description: None,
                base_version_id: initial.id.clone(),
                new_version_label: "v1.1.0-exp".to_string(),
            },
            &actor,
        )
        .await
        .unwrap();

        // Point the course's active version into the branch
        let mut course = store.get_course(&course_id).await.unwrap().unwrap();
        course.active_version_id = Some(version.id.clone());
        store.upsert_course(course).await.unwrap();

        let err = BranchManager::delete_branch(&store, &course_id, &branch.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConstraintViolation(_)));
    }
}
