use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::DomainError;
use crate::logic::{ContentOperations, OrderingService, VersionLifecycle};
use crate::model::{
    generate_id, ActorContext, Course, CourseBranch, CourseResource, CourseTopic, CourseVersion,
    NewCourse, NewEditorAssignment, NewResource, NewTopic, OrderAssignment, ResourcePatch,
    StudentProgress, TopicPatch, VersionEditor,
};
use crate::store::traits::Store;

pub type AppState<S> = Arc<S>;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

/// Translate a domain failure to an HTTP response. Partial failures are
/// logged here with their identifying context since the core does not
/// self-heal.
pub(crate) fn domain_error(err: DomainError) -> ApiError {
    let status = match &err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::ConstraintViolation(_) | DomainError::NoTipVersion { .. } => {
            StatusCode::BAD_REQUEST
        }
        DomainError::InvalidTransition(_)
        | DomainError::AlreadyClosed { .. }
        | DomainError::ConcurrentModification(_) => StatusCode::CONFLICT,
        DomainError::PartialFailure { .. } => {
            log::error!("operation left partial state: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        DomainError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(&err.to_string())))
}

pub(crate) fn upstream_error(err: anyhow::Error) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(&err.to_string())),
    )
}

/// Fire-and-forget signal that cached dashboard views of a course are
/// stale. The actual cache lives with the frontend gateway; from here it is
/// only a log line it can tail.
pub(crate) fn invalidate_course_views(scope: &str) {
    log::debug!("invalidating cached dashboard views for {}", scope);
}

/// Version with the projections derived from its canonical status
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    #[serde(flatten)]
    pub version: CourseVersion,
    pub is_active: bool,
    pub is_published: bool,
}

impl From<CourseVersion> for VersionResponse {
    fn from(version: CourseVersion) -> Self {
        let is_active = version.is_active();
        let is_published = version.is_published();
        Self {
            version,
            is_active,
            is_published,
        }
    }
}

// ---------------------------------------------------------------------------
// Courses

pub async fn list_courses<S: Store>(
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<Course>>, ApiError> {
    let courses = store.list_courses().await.map_err(upstream_error)?;
    Ok(Json(ListResponse::new(courses)))
}

/// POST /courses
/// A course is born together with its default branch; null never stands in
/// for "default branch" anywhere downstream.
pub async fn create_course<S: Store>(
    State(store): State<AppState<S>>,
    actor: ActorContext,
    RequestJson(req): RequestJson<NewCourse>,
) -> Result<(StatusCode, Json<Course>), ApiError> {
    if req.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("course title must not be empty")),
        ));
    }
    let course_id = generate_id();
    let branch = CourseBranch::new_default(course_id.clone(), actor.user_id.clone());
    let mut course = Course::new_with_id(
        course_id,
        req.title,
        req.description,
        branch.id.clone(),
        actor.user_id,
    );
    course.visibility_override = req.visibility_override;

    store
        .upsert_course(course.clone())
        .await
        .map_err(upstream_error)?;
    store.upsert_branch(branch).await.map_err(upstream_error)?;
    invalidate_course_views(&course.id);
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn get_course<S: Store>(
    Path(course_id): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<Course>, ApiError> {
    match store.get_course(&course_id).await {
        Ok(Some(course)) => Ok(Json(course)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Course not found")),
        )),
        Err(e) => Err(upstream_error(e)),
    }
}

pub async fn delete_course<S: Store>(
    Path(course_id): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = store.delete_course(&course_id).await.map_err(upstream_error)?;
    if deleted {
        invalidate_course_views(&course_id);
        Ok(Json(serde_json::json!({
            "success": true,
            "message": format!("Course '{}' deleted", course_id)
        })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Course not found")),
        ))
    }
}

// ---------------------------------------------------------------------------
// Version lifecycle

#[derive(Debug, Deserialize)]
pub struct NewVersionRequest {
    pub version_label: String,
    pub summary: Option<String>,
}

pub async fn list_versions<S: Store>(
    Path(course_id): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<VersionResponse>>, ApiError> {
    let versions = store
        .list_versions_for_course(&course_id)
        .await
        .map_err(upstream_error)?;
    Ok(Json(ListResponse::new(
        versions.into_iter().map(VersionResponse::from).collect(),
    )))
}

pub async fn get_version<S: Store>(
    Path((course_id, version_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<VersionResponse>, ApiError> {
    match store.get_version(&version_id).await {
        Ok(Some(version)) if version.course_id == course_id => {
            Ok(Json(VersionResponse::from(version)))
        }
        Ok(_) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Version not found")),
        )),
        Err(e) => Err(upstream_error(e)),
    }
}

/// POST /courses/{course_id}/versions
pub async fn create_initial_version<S: Store>(
    Path(course_id): Path<String>,
    State(store): State<AppState<S>>,
    actor: ActorContext,
    RequestJson(req): RequestJson<NewVersionRequest>,
) -> Result<(StatusCode, Json<VersionResponse>), ApiError> {
    let version = VersionLifecycle::create_initial_version(
        &*store,
        &course_id,
        req.version_label,
        req.summary,
        &actor,
    )
    .await
    .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok((StatusCode::CREATED, Json(VersionResponse::from(version))))
}

/// POST /courses/{course_id}/versions/{version_id}/draft
pub async fn create_draft<S: Store>(
    Path((course_id, version_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
    actor: ActorContext,
    RequestJson(req): RequestJson<NewVersionRequest>,
) -> Result<(StatusCode, Json<VersionResponse>), ApiError> {
    ensure_version_in_course(&*store, &course_id, &version_id).await?;
    let draft = VersionLifecycle::create_draft_from_version(
        &*store,
        &version_id,
        req.version_label,
        req.summary,
        &actor,
    )
    .await
    .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok((StatusCode::CREATED, Json(VersionResponse::from(draft))))
}

/// POST /courses/{course_id}/versions/{version_id}/submit
pub async fn submit_version<S: Store>(
    Path((course_id, version_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<VersionResponse>, ApiError> {
    ensure_version_in_course(&*store, &course_id, &version_id).await?;
    let version = VersionLifecycle::submit_for_review(&*store, &version_id)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok(Json(VersionResponse::from(version)))
}

/// POST /courses/{course_id}/versions/{version_id}/publish
pub async fn publish_version<S: Store>(
    Path((course_id, version_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
    actor: ActorContext,
) -> Result<Json<VersionResponse>, ApiError> {
    ensure_version_in_course(&*store, &course_id, &version_id).await?;
    let version = VersionLifecycle::publish(&*store, &version_id, &actor)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok(Json(VersionResponse::from(version)))
}

/// POST /courses/{course_id}/versions/{version_id}/archive
pub async fn archive_version<S: Store>(
    Path((course_id, version_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<VersionResponse>, ApiError> {
    ensure_version_in_course(&*store, &course_id, &version_id).await?;
    let version = VersionLifecycle::archive(&*store, &version_id)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok(Json(VersionResponse::from(version)))
}

// ---------------------------------------------------------------------------
// Topics

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub items: Vec<OrderAssignment>,
}

pub async fn list_topics<S: Store>(
    Path((course_id, version_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<CourseTopic>>, ApiError> {
    ensure_version_in_course(&*store, &course_id, &version_id).await?;
    let topics = store
        .list_topics_for_version(&version_id)
        .await
        .map_err(upstream_error)?;
    Ok(Json(ListResponse::new(topics)))
}

pub async fn create_topic<S: Store>(
    Path((course_id, version_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
    RequestJson(req): RequestJson<NewTopic>,
) -> Result<(StatusCode, Json<CourseTopic>), ApiError> {
    ensure_version_in_course(&*store, &course_id, &version_id).await?;
    let topic = ContentOperations::create_topic(&*store, &version_id, req)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok((StatusCode::CREATED, Json(topic)))
}

/// POST /courses/{course_id}/versions/{version_id}/topics/reorder
pub async fn reorder_topics<S: Store>(
    Path((course_id, version_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
    RequestJson(req): RequestJson<ReorderRequest>,
) -> Result<Json<ListResponse<CourseTopic>>, ApiError> {
    ensure_version_in_course(&*store, &course_id, &version_id).await?;
    OrderingService::reorder_topics(&*store, &version_id, &req.items)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    let topics = store
        .list_topics_for_version(&version_id)
        .await
        .map_err(upstream_error)?;
    Ok(Json(ListResponse::new(topics)))
}

pub async fn update_topic<S: Store>(
    Path(topic_id): Path<String>,
    State(store): State<AppState<S>>,
    RequestJson(req): RequestJson<TopicPatch>,
) -> Result<Json<CourseTopic>, ApiError> {
    let topic = ContentOperations::update_topic(&*store, &topic_id, req)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&topic.course_version_id);
    Ok(Json(topic))
}

pub async fn delete_topic<S: Store>(
    Path(topic_id): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    ContentOperations::delete_topic(&*store, &topic_id)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&topic_id);
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Topic '{}' deleted", topic_id)
    })))
}

// ---------------------------------------------------------------------------
// Resources

pub async fn list_resources<S: Store>(
    Path(topic_id): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<CourseResource>>, ApiError> {
    let resources = store
        .list_resources_for_topic(&topic_id)
        .await
        .map_err(upstream_error)?;
    Ok(Json(ListResponse::new(resources)))
}

pub async fn create_resource<S: Store>(
    Path(topic_id): Path<String>,
    State(store): State<AppState<S>>,
    RequestJson(req): RequestJson<NewResource>,
) -> Result<(StatusCode, Json<CourseResource>), ApiError> {
    let resource = ContentOperations::create_resource(&*store, &topic_id, req)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&topic_id);
    Ok((StatusCode::CREATED, Json(resource)))
}

/// POST /topics/{topic_id}/resources/reorder
pub async fn reorder_resources<S: Store>(
    Path(topic_id): Path<String>,
    State(store): State<AppState<S>>,
    RequestJson(req): RequestJson<ReorderRequest>,
) -> Result<Json<ListResponse<CourseResource>>, ApiError> {
    OrderingService::reorder_resources(&*store, &topic_id, &req.items)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&topic_id);
    let resources = store
        .list_resources_for_topic(&topic_id)
        .await
        .map_err(upstream_error)?;
    Ok(Json(ListResponse::new(resources)))
}

pub async fn update_resource<S: Store>(
    Path(resource_id): Path<String>,
    State(store): State<AppState<S>>,
    RequestJson(req): RequestJson<ResourcePatch>,
) -> Result<Json<CourseResource>, ApiError> {
    let resource = ContentOperations::update_resource(&*store, &resource_id, req)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&resource.topic_id);
    Ok(Json(resource))
}

pub async fn delete_resource<S: Store>(
    Path(resource_id): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    ContentOperations::delete_resource(&*store, &resource_id)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&resource_id);
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Resource '{}' deleted", resource_id)
    })))
}

// ---------------------------------------------------------------------------
// Editors

pub async fn list_editors<S: Store>(
    Path((course_id, version_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<VersionEditor>>, ApiError> {
    ensure_version_in_course(&*store, &course_id, &version_id).await?;
    let editors = store
        .list_editors_for_version(&version_id)
        .await
        .map_err(upstream_error)?;
    Ok(Json(ListResponse::new(editors)))
}

pub async fn assign_editor<S: Store>(
    Path((course_id, version_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
    RequestJson(req): RequestJson<NewEditorAssignment>,
) -> Result<(StatusCode, Json<VersionEditor>), ApiError> {
    ensure_version_in_course(&*store, &course_id, &version_id).await?;
    let assignment = ContentOperations::assign_editor(&*store, &version_id, req)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn remove_editor<S: Store>(
    Path((course_id, _version_id, assignment_id)): Path<(String, String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    ContentOperations::remove_editor(&*store, &assignment_id)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Assignment '{}' removed", assignment_id)
    })))
}

// ---------------------------------------------------------------------------
// Student progress

#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    /// Toggle completion when present; a bare access bump otherwise
    pub completed: Option<bool>,
}

/// POST /topics/{topic_id}/progress, where the acting user is the student
pub async fn record_progress<S: Store>(
    Path(topic_id): Path<String>,
    State(store): State<AppState<S>>,
    actor: ActorContext,
    RequestJson(req): RequestJson<ProgressUpdate>,
) -> Result<Json<StudentProgress>, ApiError> {
    let progress = match req.completed {
        Some(completed) => {
            ContentOperations::set_topic_completion(&*store, &actor.user_id, &topic_id, completed)
                .await
        }
        None => ContentOperations::record_topic_access(&*store, &actor.user_id, &topic_id).await,
    }
    .map_err(domain_error)?;
    Ok(Json(progress))
}

pub async fn list_student_progress<S: Store>(
    Path(student_id): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<StudentProgress>>, ApiError> {
    let rows = store
        .list_progress_for_student(&student_id)
        .await
        .map_err(upstream_error)?;
    Ok(Json(ListResponse::new(rows)))
}

// ---------------------------------------------------------------------------

pub(crate) async fn ensure_version_in_course<S: Store>(
    store: &S,
    course_id: &str,
    version_id: &str,
) -> Result<(), ApiError> {
    match store.get_version(&version_id.to_string()).await {
        Ok(Some(version)) if version.course_id == course_id => Ok(()),
        Ok(_) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Version not found")),
        )),
        Err(e) => Err(upstream_error(e)),
    }
}
