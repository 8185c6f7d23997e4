use crate::error::{DomainError, DomainResult};
use crate::logic::content::ContentOperations;
use crate::logic::lifecycle::VersionLifecycle;
use crate::model::{
    ActorContext, CourseVersion, Id, MergeRequest, NewMergeRequest, ReviewDecision, VersionStatus,
};
use crate::store::traits::Store;
use chrono::Utc;

/// Result of folding a source branch's tip into a target branch
#[derive(Debug)]
pub struct MergeOutcome {
    pub request: MergeRequest,
    pub new_version: CourseVersion,
}

/// Open / review / merge state machine between a source branch's tip and a
/// target branch. Merging produces a fresh version on the target carrying a
/// deep copy of the source content; merging into the course's default
/// branch auto-publishes.
pub struct MergeWorkflow;

impl MergeWorkflow {
    pub async fn open<S: Store>(
        store: &S,
        course_id: &Id,
        input: NewMergeRequest,
        actor: &ActorContext,
    ) -> DomainResult<MergeRequest> {
        if input.source_branch_id == input.target_branch_id {
            return Err(DomainError::ConstraintViolation(
                "source and target branch must differ".to_string(),
            ));
        }
        let course = store
            .get_course(course_id)
            .await?
            .ok_or_else(|| DomainError::not_found("course", course_id))?;
        for branch_id in [&input.source_branch_id, &input.target_branch_id] {
            let branch = store
                .get_branch(branch_id)
                .await?
                .ok_or_else(|| DomainError::not_found("branch", branch_id))?;
            if branch.course_id != course.id {
                return Err(DomainError::ConstraintViolation(format!(
                    "branch '{}' does not belong to course '{}'",
                    branch_id, course.id
                )));
            }
        }

        let mut source_tip = store
            .get_tip_version(&input.source_branch_id)
            .await?
            .ok_or_else(|| DomainError::NoTipVersion {
                branch_id: input.source_branch_id.clone(),
            })?;
        if let Some(claimed_by) = &source_tip.merge_request_id {
            return Err(DomainError::ConstraintViolation(format!(
                "version '{}' is already proposed by merge request '{}'",
                source_tip.id, claimed_by
            )));
        }

        let request = MergeRequest::open(
            course.id,
            input.source_branch_id,
            input.target_branch_id,
            source_tip.id.clone(),
            input.title,
            input.summary,
            actor.user_id.clone(),
            input.payload,
        );
        store.upsert_merge_request(request.clone()).await?;

        source_tip.merge_request_id = Some(request.id.clone());
        source_tip.touch();
        store.upsert_version(source_tip).await?;
        Ok(request)
    }

    /// Approve keeps the request pending for the merge step; reject closes
    /// it and frees the source version for a future request. Rejecting an
    /// already-approved request is allowed, merging or rejecting a closed
    /// one is not.
    pub async fn review<S: Store>(
        store: &S,
        request_id: &Id,
        decision: ReviewDecision,
        actor: &ActorContext,
    ) -> DomainResult<MergeRequest> {
        let mut request = Self::get_open(store, request_id).await?;
        match decision {
            ReviewDecision::Approve => {
                request.approve(actor.user_id.clone());
                store.upsert_merge_request(request.clone()).await?;
            }
            ReviewDecision::Reject => {
                request.reject(actor.user_id.clone());
                store.upsert_merge_request(request.clone()).await?;
                if let Some(mut source) = store.get_version(&request.source_version_id).await? {
                    if source.merge_request_id.as_ref() == Some(&request.id) {
                        source.merge_request_id = None;
                        source.touch();
                        store.upsert_version(source).await?;
                    }
                }
            }
        }
        Ok(request)
    }

    /// Fold the source version into the target branch. Permitted from both
    /// open and approved: anything not yet closed is mergeable. The steps
    /// are sequential store calls; a failure partway surfaces as
    /// PartialFailure naming the step, with no automatic rollback.
    pub async fn merge<S: Store>(
        store: &S,
        request_id: &Id,
        actor: &ActorContext,
    ) -> DomainResult<MergeOutcome> {
        let mut request = Self::get_open(store, request_id).await?;

        if store.get_course(&request.course_id).await?.is_none() {
            return Err(DomainError::not_found("course", &request.course_id));
        }
        let target_branch = store
            .get_branch(&request.target_branch_id)
            .await?
            .ok_or_else(|| DomainError::not_found("branch", &request.target_branch_id))?;
        let mut source = store
            .get_version(&request.source_version_id)
            .await?
            .ok_or_else(|| DomainError::not_found("version", &request.source_version_id))?;
        if source.is_merged() {
            return Err(DomainError::InvalidTransition(format!(
                "version '{}' has already been merged",
                source.id
            )));
        }

        let old_target_tip = VersionLifecycle::clear_branch_tip(store, &target_branch.id)
            .await
            .map_err(|e| {
                DomainError::partial("merge", "unseat_target_tip", anyhow::Error::new(e))
            })?;

        let label = Self::unique_label(store, &request.course_id, &source.version_label).await?;

        // Merging into the default branch goes live immediately; elsewhere
        // the source's state is carried over.
        let status = if target_branch.is_default {
            VersionStatus::Published
        } else {
            source.status
        };
        let mut new_version = CourseVersion::new_draft(
            request.course_id.clone(),
            target_branch.id.clone(),
            label,
            source.summary.clone(),
            actor.user_id.clone(),
        );
        new_version.status = status;
        new_version.parent_version_id = Some(
            old_target_tip
                .as_ref()
                .map(|t| t.id.clone())
                .unwrap_or_else(|| source.id.clone()),
        );
        new_version.based_on_version_id = Some(source.id.clone());
        if status == VersionStatus::Published {
            new_version.reviewed_by = Some(actor.user_id.clone());
            new_version.approved_at = Some(Utc::now());
            VersionLifecycle::archive_active_on_branch(store, &target_branch.id, &new_version.id)
                .await
                .map_err(|e| {
                    DomainError::partial("merge", "archive_previous_active", anyhow::Error::new(e))
                })?;
        }
        store
            .upsert_version(new_version.clone())
            .await
            .map_err(|e| DomainError::partial("merge", "insert_version", e))?;

        ContentOperations::clone_version_content(store, &source.id, &new_version.id)
            .await
            .map_err(|e| DomainError::partial("merge", "clone_content", anyhow::Error::new(e)))?;

        source.merge_request_id = None;
        source.merged_into_version_id = Some(new_version.id.clone());
        source.touch();
        store
            .upsert_version(source)
            .await
            .map_err(|e| DomainError::partial("merge", "consume_source", e))?;

        if target_branch.is_default {
            let mut course = store
                .get_course(&request.course_id)
                .await
                .map_err(|e| DomainError::partial("merge", "update_course", e))?
                .ok_or_else(|| DomainError::not_found("course", &request.course_id))?;
            course.active_version_id = Some(new_version.id.clone());
            course.touch();
            store
                .upsert_course(course)
                .await
                .map_err(|e| DomainError::partial("merge", "update_course", e))?;
        }

        request.mark_merged(actor.user_id.clone(), new_version.id.clone());
        store
            .upsert_merge_request(request.clone())
            .await
            .map_err(|e| DomainError::partial("merge", "close_request", e))?;

        Ok(MergeOutcome {
            request,
            new_version,
        })
    }

    /// Labels are unique per course; collide and the label gets a numeric
    /// suffix (-1, -2, ...) until free.
    async fn unique_label<S: Store>(
        store: &S,
        course_id: &Id,
        base_label: &str,
    ) -> DomainResult<String> {
        let taken: Vec<String> = store
            .list_versions_for_course(course_id)
            .await?
            .into_iter()
            .map(|v| v.version_label)
            .collect();
        if !taken.iter().any(|l| l == base_label) {
            return Ok(base_label.to_string());
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{}-{}", base_label, suffix);
            if !taken.iter().any(|l| l == &candidate) {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }

    async fn get_open<S: Store>(store: &S, request_id: &Id) -> DomainResult<MergeRequest> {
        let request = store
            .get_merge_request(request_id)
            .await?
            .ok_or_else(|| DomainError::not_found("merge request", request_id))?;
        if request.status.is_terminal() {
            return Err(DomainError::AlreadyClosed {
                id: request.id,
                status: request.status.as_str(),
            });
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::branch_ops::BranchManager;
    use crate::logic::content::ContentOperations;
    use crate::logic::lifecycle::VersionLifecycle;
    use crate::model::{Course, CourseBranch, MergeRequestStatus, NewBranch, NewTopic};
    use crate::store::memory::MemoryStore;
    use crate::store::traits::{BranchStore, CourseStore, MergeRequestStore, TopicStore, VersionStore};

    struct Fixture {
        course_id: Id,
        default_branch_id: Id,
        initial_version_id: Id,
        feature_branch_id: Id,
        feature_version_id: Id,
    }

    /// Course with an initial published version and an "experimental"
    /// branch forked from it carrying one extra topic.
    async fn fixture(store: &MemoryStore) -> Fixture {
        let actor = ActorContext::new("alice".to_string());
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
            &actor,
        )
        .await
        .unwrap();
        let (feature_branch, feature_version) = BranchManager::create_branch(
            store,
            &course.id,
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
        ContentOperations::create_topic(
            store,
            &feature_version.id,
            NewTopic {
                title: "New material".to_string(),
                description: None,
                order_index: None,
            },
        )
        .await
        .unwrap();
        Fixture {
            course_id: course.id,
            default_branch_id: branch.id,
            initial_version_id: initial.id,
            feature_branch_id: feature_branch.id,
            feature_version_id: feature_version.id,
        }
    }

    fn new_request(fx: &Fixture) -> NewMergeRequest {
        NewMergeRequest {
            source_branch_id: fx.feature_branch_id.clone(),
            target_branch_id: fx.default_branch_id.clone(),
            title: "Fold experiment back".to_string(),
            summary: None,
            payload: None,
        }
    }

    #[tokio::test]
    async fn open_claims_source_tip() {
        let store = MemoryStore::new();
        let fx = fixture(&store).await;
        let actor = ActorContext::new("alice".to_string());

        let request = MergeWorkflow::open(&store, &fx.course_id, new_request(&fx), &actor)
            .await
            .unwrap();
        assert_eq!(request.status, MergeRequestStatus::Open);
        assert_eq!(request.source_version_id, fx.feature_version_id);

        let source = store
            .get_version(&fx.feature_version_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(source.merge_request_id, Some(request.id.clone()));

        // A second request for the same tip is refused while this one is open
        let err = MergeWorkflow::open(&store, &fx.course_id, new_request(&fx), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn open_rejects_identical_branches() {
        let store = MemoryStore::new();
        let fx = fixture(&store).await;
        let err = MergeWorkflow::open(
            &store,
            &fx.course_id,
            NewMergeRequest {
                source_branch_id: fx.default_branch_id.clone(),
                target_branch_id: fx.default_branch_id.clone(),
                title: "No-op".to_string(),
                summary: None,
                payload: None,
            },
            &ActorContext::new("alice".to_string()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DomainError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn reject_frees_source_for_new_request() {
        let store = MemoryStore::new();
        let fx = fixture(&store).await;
        let actor = ActorContext::new("bob".to_string());

        let request = MergeWorkflow::open(&store, &fx.course_id, new_request(&fx), &actor)
            .await
            .unwrap();
        let rejected =
            MergeWorkflow::review(&store, &request.id, ReviewDecision::Reject, &actor)
                .await
                .unwrap();
        assert_eq!(rejected.status, MergeRequestStatus::Rejected);
        assert!(rejected.closed_at.is_some());

        let source = store
            .get_version(&fx.feature_version_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(source.merge_request_id, None);

        // Freed tip can be proposed again
        MergeWorkflow::open(&store, &fx.course_id, new_request(&fx), &actor)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn merge_into_default_publishes_and_moves_active_pointer() {
        let store = MemoryStore::new();
        let fx = fixture(&store).await;
        let actor = ActorContext::new("bob".to_string());

        let request = MergeWorkflow::open(&store, &fx.course_id, new_request(&fx), &actor)
            .await
            .unwrap();
        MergeWorkflow::review(&store, &request.id, ReviewDecision::Approve, &actor)
            .await
            .unwrap();
        let outcome = MergeWorkflow::merge(&store, &request.id, &actor).await.unwrap();

        let new_version = &outcome.new_version;
        assert_eq!(new_version.status, VersionStatus::Published);
        assert!(new_version.is_active());
        assert!(new_version.is_tip);
        assert_eq!(new_version.branch_id, fx.default_branch_id);
        // Source label is taken by the source itself, so the merge suffixes it
        assert_eq!(new_version.version_label, "v1.1.0-exp-1");
        assert_eq!(
            new_version.parent_version_id,
            Some(fx.initial_version_id.clone())
        );
        assert_eq!(
            new_version.based_on_version_id,
            Some(fx.feature_version_id.clone())
        );

        let old = store
            .get_version(&fx.initial_version_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!old.is_active());
        assert!(!old.is_tip);

        let course = store.get_course(&fx.course_id).await.unwrap().unwrap();
        assert_eq!(course.active_version_id, Some(new_version.id.clone()));

        let source = store
            .get_version(&fx.feature_version_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(source.merged_into_version_id, Some(new_version.id.clone()));
        assert_eq!(source.merge_request_id, None);

        let closed = store
            .get_merge_request(&request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.status, MergeRequestStatus::Merged);
        assert_eq!(closed.target_version_id, Some(new_version.id.clone()));
        assert!(closed.merged_at.is_some());

        // Content travelled with the merge
        let topics = store
            .list_topics_for_version(&new_version.id)
            .await
            .unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].title, "New material");
    }

    #[tokio::test]
    async fn merge_is_permitted_straight_from_open() {
        let store = MemoryStore::new();
        let fx = fixture(&store).await;
        let actor = ActorContext::new("bob".to_string());

        let request = MergeWorkflow::open(&store, &fx.course_id, new_request(&fx), &actor)
            .await
            .unwrap();
        let outcome = MergeWorkflow::merge(&store, &request.id, &actor).await.unwrap();
        assert_eq!(outcome.request.status, MergeRequestStatus::Merged);
    }

    #[tokio::test]
    async fn closed_requests_refuse_further_operations() {
        let store = MemoryStore::new();
        let fx = fixture(&store).await;
        let actor = ActorContext::new("bob".to_string());

        let request = MergeWorkflow::open(&store, &fx.course_id, new_request(&fx), &actor)
            .await
            .unwrap();
        MergeWorkflow::review(&store, &request.id, ReviewDecision::Reject, &actor)
            .await
            .unwrap();

        let err = MergeWorkflow::merge(&store, &request.id, &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyClosed { .. }));
        let err = MergeWorkflow::review(&store, &request.id, ReviewDecision::Approve, &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyClosed { .. }));

        // Nothing moved: the default branch tip is still the initial version
        let tip = store
            .get_tip_version(&fx.default_branch_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tip.id, fx.initial_version_id);
    }

    #[tokio::test]
    async fn merge_into_feature_branch_inherits_source_status() {
        let store = MemoryStore::new();
        let fx = fixture(&store).await;
        let actor = ActorContext::new("alice".to_string());

        // Second branch to merge the experiment into
        let initial = store
            .get_version(&fx.initial_version_id)
            .await
            .unwrap()
            .unwrap();
        let (staging, _) = BranchManager::create_branch(
            &store,
            &fx.course_id,
            NewBranch {
                name: "staging".to_string(),
                description: None,
                base_version_id: initial.id.clone(),
                new_version_label: "v1.0.1-staging".to_string(),
            },
            &actor,
        )
        .await
        .unwrap();

        let request = MergeWorkflow::open(
            &store,
            &fx.course_id,
            NewMergeRequest {
                source_branch_id: fx.feature_branch_id.clone(),
                target_branch_id: staging.id.clone(),
                title: "Experiment into staging".to_string(),
                summary: None,
                payload: None,
            },
            &actor,
        )
        .await
        .unwrap();
        let outcome = MergeWorkflow::merge(&store, &request.id, &actor).await.unwrap();

        // Source was a draft, so the merged version stays a draft
        assert_eq!(outcome.new_version.status, VersionStatus::Draft);
        assert!(!outcome.new_version.is_active());

        // The course's active pointer is untouched
        let course = store.get_course(&fx.course_id).await.unwrap().unwrap();
        assert_eq!(course.active_version_id, Some(fx.initial_version_id.clone()));
    }
}
