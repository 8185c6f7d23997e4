use crate::api::handlers::{
    domain_error, invalidate_course_views, upstream_error, ApiError, AppState, ErrorResponse,
    ListResponse, VersionResponse,
};
use crate::logic::MergeWorkflow;
use crate::model::{ActorContext, MergeRequest, NewMergeRequest, ReviewDecision};
use crate::store::traits::Store;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub request: MergeRequest,
    pub new_version: VersionResponse,
    pub message: String,
}

/// POST /courses/{course_id}/merge-requests
pub async fn open_merge_request<S: Store>(
    Path(course_id): Path<String>,
    State(store): State<AppState<S>>,
    actor: ActorContext,
    RequestJson(req): RequestJson<NewMergeRequest>,
) -> Result<(StatusCode, Json<MergeRequest>), ApiError> {
    let request = MergeWorkflow::open(&*store, &course_id, req, &actor)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_merge_requests<S: Store>(
    Path(course_id): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<MergeRequest>>, ApiError> {
    match store.get_course(&course_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("Course not found")),
            ));
        }
        Err(e) => return Err(upstream_error(e)),
    }
    let requests = store
        .list_merge_requests_for_course(&course_id)
        .await
        .map_err(upstream_error)?;
    Ok(Json(ListResponse::new(requests)))
}

pub async fn get_merge_request<S: Store>(
    Path((course_id, request_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<MergeRequest>, ApiError> {
    match store.get_merge_request(&request_id).await {
        Ok(Some(request)) if request.course_id == course_id => Ok(Json(request)),
        Ok(_) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Merge request not found")),
        )),
        Err(e) => Err(upstream_error(e)),
    }
}

/// POST /courses/{course_id}/merge-requests/{request_id}/review
/// Approve keeps the request pending for merge; reject closes it and frees
/// the proposed version.
pub async fn review_merge_request<S: Store>(
    Path((course_id, request_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
    actor: ActorContext,
    RequestJson(req): RequestJson<ReviewRequest>,
) -> Result<Json<MergeRequest>, ApiError> {
    let request = MergeWorkflow::review(&*store, &request_id, req.decision, &actor)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok(Json(request))
}

/// POST /courses/{course_id}/merge-requests/{request_id}/merge
pub async fn merge_merge_request<S: Store>(
    Path((course_id, request_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
    actor: ActorContext,
) -> Result<Json<MergeResponse>, ApiError> {
    let outcome = MergeWorkflow::merge(&*store, &request_id, &actor)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    let message = format!(
        "Merged '{}' into branch '{}' as version '{}'",
        outcome.request.source_version_id,
        outcome.request.target_branch_id,
        outcome.new_version.version_label
    );
    Ok(Json(MergeResponse {
        request: outcome.request,
        new_version: VersionResponse::from(outcome.new_version),
        message,
    }))
}
