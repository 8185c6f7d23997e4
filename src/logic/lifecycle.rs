use crate::error::{DomainError, DomainResult};
use crate::logic::content::ContentOperations;
use crate::model::{ActorContext, CourseVersion, Id, VersionStatus};
use crate::store::traits::Store;
use chrono::Utc;

/// Governs version status transitions (draft -> pending_review -> published
/// -> archived) and the tip marker per branch. Role and permission checks
/// belong to the caller; this engine only enforces state invariants.
pub struct VersionLifecycle;

impl VersionLifecycle {
    /// First version of a course. Only valid while the course has no active
    /// version; the version goes live immediately since there is nothing to
    /// unseat.
    pub async fn create_initial_version<S: Store>(
        store: &S,
        course_id: &Id,
        version_label: String,
        summary: Option<String>,
        actor: &ActorContext,
    ) -> DomainResult<CourseVersion> {
        let mut course = store
            .get_course(course_id)
            .await?
            .ok_or_else(|| DomainError::not_found("course", course_id))?;
        if course.active_version_id.is_some() {
            return Err(DomainError::ConstraintViolation(format!(
                "course '{}' already has an active version",
                course.id
            )));
        }
        Self::ensure_label_free(store, course_id, &version_label).await?;

        let default_branch = store
            .get_default_branch(course_id)
            .await?
            .ok_or_else(|| DomainError::not_found("default branch", course_id))?;
        Self::clear_branch_tip(store, &default_branch.id).await?;

        let version = CourseVersion::new_published(
            course.id.clone(),
            default_branch.id,
            version_label,
            summary,
            actor.user_id.clone(),
        );
        store.upsert_version(version.clone()).await?;

        course.active_version_id = Some(version.id.clone());
        course.touch();
        store.upsert_course(course).await?;
        Ok(version)
    }

    /// New draft tip on the base version's branch, carrying a deep copy of
    /// the base version's content.
    pub async fn create_draft_from_version<S: Store>(
        store: &S,
        base_version_id: &Id,
        version_label: String,
        summary: Option<String>,
        actor: &ActorContext,
    ) -> DomainResult<CourseVersion> {
        let base = store
            .get_version(base_version_id)
            .await?
            .ok_or_else(|| DomainError::not_found("version", base_version_id))?;
        Self::ensure_label_free(store, &base.course_id, &version_label).await?;

        let previous_tip = Self::clear_branch_tip(store, &base.branch_id).await?;

        let mut draft = CourseVersion::new_draft(
            base.course_id.clone(),
            base.branch_id.clone(),
            version_label,
            summary,
            actor.user_id.clone(),
        );
        draft.parent_version_id = Some(base.id.clone());
        store.upsert_version(draft.clone()).await?;

        if let Err(e) = ContentOperations::clone_version_content(store, &base.id, &draft.id).await {
            // Roll the half-created draft back so the branch keeps a clean tip.
            let cleanup: DomainResult<()> = async {
                store.delete_version(&draft.id).await?;
                if let Some(mut tip) = previous_tip {
                    tip.is_tip = true;
                    tip.touch();
                    store.upsert_version(tip).await?;
                }
                Ok(())
            }
            .await;
            if let Err(cleanup_err) = cleanup {
                log::error!(
                    "draft {} for base {} left partial after failed clone; cleanup also failed: {}",
                    draft.id,
                    base.id,
                    cleanup_err
                );
                return Err(DomainError::partial(
                    "create_draft_from_version",
                    "clone_cleanup",
                    anyhow::Error::new(e),
                ));
            }
            return Err(DomainError::partial(
                "create_draft_from_version",
                "clone_content",
                anyhow::Error::new(e),
            ));
        }
        Ok(draft)
    }

    /// Draft -> pending review; any other starting state is rejected.
    pub async fn submit_for_review<S: Store>(
        store: &S,
        version_id: &Id,
    ) -> DomainResult<CourseVersion> {
        let mut version = Self::get_unmerged(store, version_id).await?;
        if version.status != VersionStatus::Draft {
            return Err(DomainError::InvalidTransition(format!(
                "version '{}' cannot be submitted from status '{}'",
                version.id,
                version.status.as_str()
            )));
        }
        version.status = VersionStatus::PendingReview;
        version.touch();
        store.upsert_version(version.clone()).await?;
        Ok(version)
    }

    /// Approve a draft or pending version. Whichever version on the same
    /// branch was live gets archived, and when the branch is the course
    /// default the course's active version pointer moves here.
    pub async fn publish<S: Store>(
        store: &S,
        version_id: &Id,
        actor: &ActorContext,
    ) -> DomainResult<CourseVersion> {
        let mut version = Self::get_unmerged(store, version_id).await?;
        if !matches!(
            version.status,
            VersionStatus::Draft | VersionStatus::PendingReview
        ) {
            return Err(DomainError::InvalidTransition(format!(
                "version '{}' cannot be published from status '{}'",
                version.id,
                version.status.as_str()
            )));
        }

        Self::archive_active_on_branch(store, &version.branch_id, &version.id).await?;

        version.status = VersionStatus::Published;
        version.reviewed_by = Some(actor.user_id.clone());
        version.approved_at = Some(Utc::now());
        version.touch();
        store.upsert_version(version.clone()).await?;

        let branch = store
            .get_branch(&version.branch_id)
            .await?
            .ok_or_else(|| DomainError::not_found("branch", &version.branch_id))?;
        if branch.is_default {
            let mut course = store
                .get_course(&version.course_id)
                .await?
                .ok_or_else(|| DomainError::not_found("course", &version.course_id))?;
            course.active_version_id = Some(version.id.clone());
            course.touch();
            store.upsert_course(course).await?;
        }
        Ok(version)
    }

    /// Take the live version of a branch offline. Keeps the publication
    /// provenance (`is_published` stays true) but drops it from current
    /// queries; the course's active pointer is cleared when it pointed here.
    pub async fn archive<S: Store>(store: &S, version_id: &Id) -> DomainResult<CourseVersion> {
        let mut version = store
            .get_version(version_id)
            .await?
            .ok_or_else(|| DomainError::not_found("version", version_id))?;
        if !version.is_active() {
            return Err(DomainError::InvalidTransition(format!(
                "version '{}' is not active (status '{}'), only the active version can be archived",
                version.id,
                version.status.as_str()
            )));
        }
        version.status = VersionStatus::Archived;
        version.touch();
        store.upsert_version(version.clone()).await?;

        let mut course = store
            .get_course(&version.course_id)
            .await?
            .ok_or_else(|| DomainError::not_found("course", &version.course_id))?;
        if course.active_version_id.as_ref() == Some(&version.id) {
            course.active_version_id = None;
            course.touch();
            store.upsert_course(course).await?;
        }
        Ok(version)
    }

    /// Version labels are unique within a course
    pub(crate) async fn ensure_label_free<S: Store>(
        store: &S,
        course_id: &Id,
        label: &str,
    ) -> DomainResult<()> {
        let versions = store.list_versions_for_course(course_id).await?;
        if versions.iter().any(|v| v.version_label == label) {
            return Err(DomainError::ConstraintViolation(format!(
                "version label '{}' already exists in course '{}'",
                label, course_id
            )));
        }
        Ok(())
    }

    /// Drop the tip marker from a branch's current tip, returning the
    /// version that held it.
    pub(crate) async fn clear_branch_tip<S: Store>(
        store: &S,
        branch_id: &Id,
    ) -> DomainResult<Option<CourseVersion>> {
        let Some(mut tip) = store.get_tip_version(branch_id).await? else {
            return Ok(None);
        };
        tip.is_tip = false;
        tip.touch();
        store.upsert_version(tip.clone()).await?;
        Ok(Some(tip))
    }

    /// Archive whichever version on the branch is currently live, so a
    /// branch never ends up with two active versions.
    pub(crate) async fn archive_active_on_branch<S: Store>(
        store: &S,
        branch_id: &Id,
        except_version_id: &Id,
    ) -> DomainResult<Option<Id>> {
        let versions = store.list_versions_for_branch(branch_id).await?;
        for mut version in versions {
            if version.is_active() && &version.id != except_version_id {
                let id = version.id.clone();
                version.status = VersionStatus::Archived;
                version.touch();
                store.upsert_version(version).await?;
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    async fn get_unmerged<S: Store>(store: &S, version_id: &Id) -> DomainResult<CourseVersion> {
        let version = store
            .get_version(version_id)
            .await?
            .ok_or_else(|| DomainError::not_found("version", version_id))?;
        if version.is_merged() {
            return Err(DomainError::InvalidTransition(format!(
                "version '{}' has been merged into '{}' and is immutable",
                version.id,
                version.merged_into_version_id.as_deref().unwrap_or("")
            )));
        }
        Ok(version)
    }
}
