use anyhow::{anyhow, Context, Result};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};

use crate::model::{
    Course, CourseBranch, CourseResource, CourseTopic, CourseVersion, EditorRole, Id,
    MergeRequest, MergeRequestStatus, ResourceType, StudentProgress, VersionEditor, VersionStatus,
};
use crate::store::traits::{
    BranchStore, CourseStore, EditorStore, MergeRequestStore, ProgressStore, ResourceStore, Store,
    TopicStore, VersionStore,
};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_course(row: &PgRow) -> Course {
    Course {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        visibility_override: row.get("visibility_override"),
        active_version_id: row.get("active_version_id"),
        default_branch_id: row.get("default_branch_id"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_branch(row: &PgRow) -> CourseBranch {
    CourseBranch {
        id: row.get("id"),
        course_id: row.get("course_id"),
        name: row.get("name"),
        description: row.get("description"),
        parent_branch_id: row.get("parent_branch_id"),
        base_version_id: row.get("base_version_id"),
        is_default: row.get("is_default"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

fn row_to_version(row: &PgRow) -> Result<CourseVersion> {
    let status: String = row.get("status");
    let status = VersionStatus::parse(&status)
        .ok_or_else(|| anyhow!("unknown version status '{}'", status))?;
    Ok(CourseVersion {
        id: row.get("id"),
        course_id: row.get("course_id"),
        branch_id: row.get("branch_id"),
        version_label: row.get("version_label"),
        summary: row.get("summary"),
        status,
        is_tip: row.get("is_tip"),
        parent_version_id: row.get("parent_version_id"),
        based_on_version_id: row.get("based_on_version_id"),
        merged_into_version_id: row.get("merged_into_version_id"),
        merge_request_id: row.get("merge_request_id"),
        created_by: row.get("created_by"),
        reviewed_by: row.get("reviewed_by"),
        approved_at: row.get("approved_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_merge_request(row: &PgRow) -> Result<MergeRequest> {
    let status: String = row.get("status");
    let status = MergeRequestStatus::parse(&status)
        .ok_or_else(|| anyhow!("unknown merge request status '{}'", status))?;
    Ok(MergeRequest {
        id: row.get("id"),
        course_id: row.get("course_id"),
        source_branch_id: row.get("source_branch_id"),
        target_branch_id: row.get("target_branch_id"),
        source_version_id: row.get("source_version_id"),
        target_version_id: row.get("target_version_id"),
        title: row.get("title"),
        summary: row.get("summary"),
        status,
        opened_by: row.get("opened_by"),
        reviewer_id: row.get("reviewer_id"),
        opened_at: row.get("opened_at"),
        closed_at: row.get("closed_at"),
        merged_at: row.get("merged_at"),
        payload: row.get("payload"),
    })
}

fn row_to_topic(row: &PgRow) -> CourseTopic {
    CourseTopic {
        id: row.get("id"),
        course_version_id: row.get("course_version_id"),
        title: row.get("title"),
        description: row.get("description"),
        order_index: row.get("order_index"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_resource(row: &PgRow) -> Result<CourseResource> {
    let resource_type: String = row.get("resource_type");
    let resource_type = ResourceType::parse(&resource_type)
        .ok_or_else(|| anyhow!("unknown resource type '{}'", resource_type))?;
    let content: serde_json::Value = row.get("content");
    let content = serde_json::from_value(content).context("Failed to decode resource content")?;
    Ok(CourseResource {
        id: row.get("id"),
        topic_id: row.get("topic_id"),
        title: row.get("title"),
        description: row.get("description"),
        resource_type,
        content,
        order_index: row.get("order_index"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_progress(row: &PgRow) -> StudentProgress {
    StudentProgress {
        id: row.get("id"),
        student_id: row.get("student_id"),
        topic_id: row.get("topic_id"),
        completed: row.get("completed"),
        completed_at: row.get("completed_at"),
        last_accessed_at: row.get("last_accessed_at"),
    }
}

fn row_to_editor(row: &PgRow) -> Result<VersionEditor> {
    let role: String = row.get("role");
    let role =
        EditorRole::parse(&role).ok_or_else(|| anyhow!("unknown editor role '{}'", role))?;
    Ok(VersionEditor {
        id: row.get("id"),
        course_version_id: row.get("course_version_id"),
        user_id: row.get("user_id"),
        role,
        assigned_at: row.get("assigned_at"),
    })
}

#[async_trait::async_trait]
impl CourseStore for PostgresStore {
    async fn get_course(&self, id: &Id) -> Result<Option<Course>> {
        let row = sqlx::query("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch course")?;
        Ok(row.map(|r| row_to_course(&r)))
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let rows = sqlx::query("SELECT * FROM courses ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list courses")?;
        Ok(rows.iter().map(row_to_course).collect())
    }

    async fn upsert_course(&self, course: Course) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO courses (id, title, description, visibility_override, active_version_id, default_branch_id, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                visibility_override = EXCLUDED.visibility_override,
                active_version_id = EXCLUDED.active_version_id,
                default_branch_id = EXCLUDED.default_branch_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(course.visibility_override)
        .bind(&course.active_version_id)
        .bind(&course.default_branch_id)
        .bind(&course.created_by)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert course")?;
        Ok(())
    }

    async fn delete_course(&self, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete course")?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl BranchStore for PostgresStore {
    async fn get_branch(&self, id: &Id) -> Result<Option<CourseBranch>> {
        let row = sqlx::query("SELECT * FROM course_branches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch branch")?;
        Ok(row.map(|r| row_to_branch(&r)))
    }

    async fn list_branches_for_course(&self, course_id: &Id) -> Result<Vec<CourseBranch>> {
        let rows =
            sqlx::query("SELECT * FROM course_branches WHERE course_id = $1 ORDER BY created_at")
                .bind(course_id)
                .fetch_all(&self.pool)
                .await
                .context("Failed to list branches")?;
        Ok(rows.iter().map(row_to_branch).collect())
    }

    async fn get_default_branch(&self, course_id: &Id) -> Result<Option<CourseBranch>> {
        let row =
            sqlx::query("SELECT * FROM course_branches WHERE course_id = $1 AND is_default")
                .bind(course_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to fetch default branch")?;
        Ok(row.map(|r| row_to_branch(&r)))
    }

    async fn upsert_branch(&self, branch: CourseBranch) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO course_branches (id, course_id, name, description, parent_branch_id, base_version_id, is_default, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                parent_branch_id = EXCLUDED.parent_branch_id,
                base_version_id = EXCLUDED.base_version_id,
                is_default = EXCLUDED.is_default
            "#,
        )
        .bind(&branch.id)
        .bind(&branch.course_id)
        .bind(&branch.name)
        .bind(&branch.description)
        .bind(&branch.parent_branch_id)
        .bind(&branch.base_version_id)
        .bind(branch.is_default)
        .bind(&branch.created_by)
        .bind(branch.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert branch")?;
        Ok(())
    }

    async fn delete_branch(&self, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM course_branches WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete branch")?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_branch_with_version(
        &self,
        branch: CourseBranch,
        version: CourseVersion,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin branch creation transaction")?;

        sqlx::query(
            r#"
            INSERT INTO course_branches (id, course_id, name, description, parent_branch_id, base_version_id, is_default, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&branch.id)
        .bind(&branch.course_id)
        .bind(&branch.name)
        .bind(&branch.description)
        .bind(&branch.parent_branch_id)
        .bind(&branch.base_version_id)
        .bind(branch.is_default)
        .bind(&branch.created_by)
        .bind(branch.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert branch")?;

        sqlx::query(
            r#"
            INSERT INTO course_versions (id, course_id, branch_id, version_label, summary, status, is_tip, parent_version_id, based_on_version_id, merged_into_version_id, merge_request_id, created_by, reviewed_by, approved_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(&version.id)
        .bind(&version.course_id)
        .bind(&version.branch_id)
        .bind(&version.version_label)
        .bind(&version.summary)
        .bind(version.status.as_str())
        .bind(version.is_tip)
        .bind(&version.parent_version_id)
        .bind(&version.based_on_version_id)
        .bind(&version.merged_into_version_id)
        .bind(&version.merge_request_id)
        .bind(&version.created_by)
        .bind(&version.reviewed_by)
        .bind(version.approved_at)
        .bind(version.created_at)
        .bind(version.updated_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert branch tip version")?;

        tx.commit()
            .await
            .context("Failed to commit branch creation transaction")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl VersionStore for PostgresStore {
    async fn get_version(&self, id: &Id) -> Result<Option<CourseVersion>> {
        let row = sqlx::query("SELECT * FROM course_versions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch version")?;
        row.map(|r| row_to_version(&r)).transpose()
    }

    async fn list_versions_for_course(&self, course_id: &Id) -> Result<Vec<CourseVersion>> {
        let rows =
            sqlx::query("SELECT * FROM course_versions WHERE course_id = $1 ORDER BY created_at")
                .bind(course_id)
                .fetch_all(&self.pool)
                .await
                .context("Failed to list versions")?;
        rows.iter().map(row_to_version).collect()
    }

    async fn list_versions_for_branch(&self, branch_id: &Id) -> Result<Vec<CourseVersion>> {
        let rows =
            sqlx::query("SELECT * FROM course_versions WHERE branch_id = $1 ORDER BY created_at")
                .bind(branch_id)
                .fetch_all(&self.pool)
                .await
                .context("Failed to list branch versions")?;
        rows.iter().map(row_to_version).collect()
    }

    async fn get_tip_version(&self, branch_id: &Id) -> Result<Option<CourseVersion>> {
        let row = sqlx::query("SELECT * FROM course_versions WHERE branch_id = $1 AND is_tip")
            .bind(branch_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch tip version")?;
        row.map(|r| row_to_version(&r)).transpose()
    }

    async fn upsert_version(&self, version: CourseVersion) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO course_versions (id, course_id, branch_id, version_label, summary, status, is_tip, parent_version_id, based_on_version_id, merged_into_version_id, merge_request_id, created_by, reviewed_by, approved_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                version_label = EXCLUDED.version_label,
                summary = EXCLUDED.summary,
                status = EXCLUDED.status,
                is_tip = EXCLUDED.is_tip,
                parent_version_id = EXCLUDED.parent_version_id,
                based_on_version_id = EXCLUDED.based_on_version_id,
                merged_into_version_id = EXCLUDED.merged_into_version_id,
                merge_request_id = EXCLUDED.merge_request_id,
                reviewed_by = EXCLUDED.reviewed_by,
                approved_at = EXCLUDED.approved_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&version.id)
        .bind(&version.course_id)
        .bind(&version.branch_id)
        .bind(&version.version_label)
        .bind(&version.summary)
        .bind(version.status.as_str())
        .bind(version.is_tip)
        .bind(&version.parent_version_id)
        .bind(&version.based_on_version_id)
        .bind(&version.merged_into_version_id)
        .bind(&version.merge_request_id)
        .bind(&version.created_by)
        .bind(&version.reviewed_by)
        .bind(version.approved_at)
        .bind(version.created_at)
        .bind(version.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert version")?;
        Ok(())
    }

    async fn delete_version(&self, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM course_versions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete version")?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl MergeRequestStore for PostgresStore {
    async fn get_merge_request(&self, id: &Id) -> Result<Option<MergeRequest>> {
        let row = sqlx::query("SELECT * FROM merge_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch merge request")?;
        row.map(|r| row_to_merge_request(&r)).transpose()
    }

    async fn list_merge_requests_for_course(&self, course_id: &Id) -> Result<Vec<MergeRequest>> {
        let rows =
            sqlx::query("SELECT * FROM merge_requests WHERE course_id = $1 ORDER BY opened_at")
                .bind(course_id)
                .fetch_all(&self.pool)
                .await
                .context("Failed to list merge requests")?;
        rows.iter().map(row_to_merge_request).collect()
    }

    async fn upsert_merge_request(&self, request: MergeRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO merge_requests (id, course_id, source_branch_id, target_branch_id, source_version_id, target_version_id, title, summary, status, opened_by, reviewer_id, opened_at, closed_at, merged_at, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (id) DO UPDATE SET
                target_version_id = EXCLUDED.target_version_id,
                title = EXCLUDED.title,
                summary = EXCLUDED.summary,
                status = EXCLUDED.status,
                reviewer_id = EXCLUDED.reviewer_id,
                closed_at = EXCLUDED.closed_at,
                merged_at = EXCLUDED.merged_at,
                payload = EXCLUDED.payload
            "#,
        )
        .bind(&request.id)
        .bind(&request.course_id)
        .bind(&request.source_branch_id)
        .bind(&request.target_branch_id)
        .bind(&request.source_version_id)
        .bind(&request.target_version_id)
        .bind(&request.title)
        .bind(&request.summary)
        .bind(request.status.as_str())
        .bind(&request.opened_by)
        .bind(&request.reviewer_id)
        .bind(request.opened_at)
        .bind(request.closed_at)
        .bind(request.merged_at)
        .bind(&request.payload)
        .execute(&self.pool)
        .await
        .context("Failed to upsert merge request")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TopicStore for PostgresStore {
    async fn get_topic(&self, id: &Id) -> Result<Option<CourseTopic>> {
        let row = sqlx::query("SELECT * FROM course_topics WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch topic")?;
        Ok(row.map(|r| row_to_topic(&r)))
    }

    async fn list_topics_for_version(&self, version_id: &Id) -> Result<Vec<CourseTopic>> {
        let rows = sqlx::query(
            "SELECT * FROM course_topics WHERE course_version_id = $1 ORDER BY order_index, created_at",
        )
        .bind(version_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list topics")?;
        Ok(rows.iter().map(row_to_topic).collect())
    }

    async fn upsert_topic(&self, topic: CourseTopic) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO course_topics (id, course_version_id, title, description, order_index, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                order_index = EXCLUDED.order_index,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&topic.id)
        .bind(&topic.course_version_id)
        .bind(&topic.title)
        .bind(&topic.description)
        .bind(topic.order_index)
        .bind(topic.created_at)
        .bind(topic.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert topic")?;
        Ok(())
    }

    async fn delete_topic(&self, id: &Id) -> Result<bool> {
        // Resources and progress rows go via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM course_topics WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete topic")?;
        Ok(result.rows_affected() > 0)
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
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin reorder transaction")?;
        let result = sqlx::query(
            r#"
            UPDATE course_topics AS t
            SET order_index = u.order_index, updated_at = NOW()
            FROM (SELECT unnest($1::text[]) AS id, unnest($2::int[]) AS order_index) AS u
            WHERE t.id = u.id AND t.course_version_id = $3
            "#,
        )
        .bind(topic_ids)
        .bind(order_indices)
        .bind(version_id)
        .execute(&mut *tx)
        .await
        .context("Failed to apply batch topic reorder")?;
        if result.rows_affected() != topic_ids.len() as u64 {
            tx.rollback().await.ok();
            return Err(anyhow!(
                "batch topic reorder matched {} of {} rows",
                result.rows_affected(),
                topic_ids.len()
            ));
        }
        tx.commit()
            .await
            .context("Failed to commit reorder transaction")?;
        Ok(())
    }

    async fn set_topic_order(&self, topic_id: &Id, order_index: i32) -> Result<()> {
        sqlx::query("UPDATE course_topics SET order_index = $2, updated_at = NOW() WHERE id = $1")
            .bind(topic_id)
            .bind(order_index)
            .execute(&self.pool)
            .await
            .context("Failed to set topic order")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceStore for PostgresStore {
    async fn get_resource(&self, id: &Id) -> Result<Option<CourseResource>> {
        let row = sqlx::query("SELECT * FROM course_resources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch resource")?;
        row.map(|r| row_to_resource(&r)).transpose()
    }

    async fn list_resources_for_topic(&self, topic_id: &Id) -> Result<Vec<CourseResource>> {
        let rows = sqlx::query(
            "SELECT * FROM course_resources WHERE topic_id = $1 ORDER BY order_index, created_at",
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list resources")?;
        rows.iter().map(row_to_resource).collect()
    }

    async fn upsert_resource(&self, resource: CourseResource) -> Result<()> {
        let content =
            serde_json::to_value(&resource.content).context("Failed to encode resource content")?;
        sqlx::query(
            r#"
            INSERT INTO course_resources (id, topic_id, title, description, resource_type, content, order_index, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                resource_type = EXCLUDED.resource_type,
                content = EXCLUDED.content,
                order_index = EXCLUDED.order_index,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&resource.id)
        .bind(&resource.topic_id)
        .bind(&resource.title)
        .bind(&resource.description)
        .bind(resource.resource_type.as_str())
        .bind(content)
        .bind(resource.order_index)
        .bind(resource.created_at)
        .bind(resource.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert resource")?;
        Ok(())
    }

    async fn delete_resource(&self, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM course_resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete resource")?;
        Ok(result.rows_affected() > 0)
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
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin reorder transaction")?;
        let result = sqlx::query(
            r#"
            UPDATE course_resources AS r
            SET order_index = u.order_index, updated_at = NOW()
            FROM (SELECT unnest($1::text[]) AS id, unnest($2::int[]) AS order_index) AS u
            WHERE r.id = u.id AND r.topic_id = $3
            "#,
        )
        .bind(resource_ids)
        .bind(order_indices)
        .bind(topic_id)
        .execute(&mut *tx)
        .await
        .context("Failed to apply batch resource reorder")?;
        if result.rows_affected() != resource_ids.len() as u64 {
            tx.rollback().await.ok();
            return Err(anyhow!(
                "batch resource reorder matched {} of {} rows",
                result.rows_affected(),
                resource_ids.len()
            ));
        }
        tx.commit()
            .await
            .context("Failed to commit reorder transaction")?;
        Ok(())
    }

    async fn set_resource_order(&self, resource_id: &Id, order_index: i32) -> Result<()> {
        sqlx::query(
            "UPDATE course_resources SET order_index = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(resource_id)
        .bind(order_index)
        .execute(&self.pool)
        .await
        .context("Failed to set resource order")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProgressStore for PostgresStore {
    async fn get_progress(
        &self,
        student_id: &Id,
        topic_id: &Id,
    ) -> Result<Option<StudentProgress>> {
        let row =
            sqlx::query("SELECT * FROM student_progress WHERE student_id = $1 AND topic_id = $2")
                .bind(student_id)
                .bind(topic_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to fetch progress")?;
        Ok(row.map(|r| row_to_progress(&r)))
    }

    async fn list_progress_for_student(&self, student_id: &Id) -> Result<Vec<StudentProgress>> {
        let rows = sqlx::query(
            "SELECT * FROM student_progress WHERE student_id = $1 ORDER BY last_accessed_at",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list student progress")?;
        Ok(rows.iter().map(row_to_progress).collect())
    }

    async fn list_progress_for_topic(&self, topic_id: &Id) -> Result<Vec<StudentProgress>> {
        let rows = sqlx::query("SELECT * FROM student_progress WHERE topic_id = $1")
            .bind(topic_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list topic progress")?;
        Ok(rows.iter().map(row_to_progress).collect())
    }

    async fn upsert_progress(&self, progress: StudentProgress) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO student_progress (id, student_id, topic_id, completed, completed_at, last_accessed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (student_id, topic_id) DO UPDATE SET
                completed = EXCLUDED.completed,
                completed_at = EXCLUDED.completed_at,
                last_accessed_at = EXCLUDED.last_accessed_at
            "#,
        )
        .bind(&progress.id)
        .bind(&progress.student_id)
        .bind(&progress.topic_id)
        .bind(progress.completed)
        .bind(progress.completed_at)
        .bind(progress.last_accessed_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert progress")?;
        Ok(())
    }

    async fn delete_progress_for_topic(&self, topic_id: &Id) -> Result<u64> {
        let result = sqlx::query("DELETE FROM student_progress WHERE topic_id = $1")
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete topic progress")?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl EditorStore for PostgresStore {
    async fn get_editor_assignment(&self, id: &Id) -> Result<Option<VersionEditor>> {
        let row = sqlx::query("SELECT * FROM version_editors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch editor assignment")?;
        row.map(|r| row_to_editor(&r)).transpose()
    }

    async fn list_editors_for_version(&self, version_id: &Id) -> Result<Vec<VersionEditor>> {
        let rows = sqlx::query(
            "SELECT * FROM version_editors WHERE course_version_id = $1 ORDER BY assigned_at",
        )
        .bind(version_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list editor assignments")?;
        rows.iter().map(row_to_editor).collect()
    }

    async fn upsert_editor_assignment(&self, assignment: VersionEditor) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO version_editors (id, course_version_id, user_id, role, assigned_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                role = EXCLUDED.role
            "#,
        )
        .bind(&assignment.id)
        .bind(&assignment.course_version_id)
        .bind(&assignment.user_id)
        .bind(assignment.role.as_str())
        .bind(assignment.assigned_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert editor assignment")?;
        Ok(())
    }

    async fn delete_editor_assignment(&self, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM version_editors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete editor assignment")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_editors_for_version(&self, version_id: &Id) -> Result<u64> {
        let result = sqlx::query("DELETE FROM version_editors WHERE course_version_id = $1")
            .bind(version_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete version editor assignments")?;
        Ok(result.rows_affected())
    }
}

impl Store for PostgresStore {}
