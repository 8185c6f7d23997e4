use crate::api::handlers::{
    domain_error, invalidate_course_views, upstream_error, ApiError, AppState, ErrorResponse,
    ListResponse, VersionResponse,
};
use crate::logic::BranchManager;
use crate::model::{ActorContext, CourseBranch, NewBranch};
use crate::store::traits::Store;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BranchWithTipResponse {
    #[serde(flatten)]
    pub branch: CourseBranch,
    pub tip_version: Option<VersionResponse>,
}

#[derive(Debug, Serialize)]
pub struct CreateBranchResponse {
    pub branch: CourseBranch,
    pub version: VersionResponse,
}

pub async fn list_branches<S: Store>(
    Path(course_id): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<CourseBranch>>, ApiError> {
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
    let branches = store
        .list_branches_for_course(&course_id)
        .await
        .map_err(upstream_error)?;
    Ok(Json(ListResponse::new(branches)))
}

/// POST /courses/{course_id}/branches
/// Fork a branch off a base version, with a fresh draft tip carrying a deep
/// copy of the base content.
pub async fn create_branch<S: Store>(
    Path(course_id): Path<String>,
    State(store): State<AppState<S>>,
    actor: ActorContext,
    RequestJson(req): RequestJson<NewBranch>,
) -> Result<(StatusCode, Json<CreateBranchResponse>), ApiError> {
    let (branch, version) = BranchManager::create_branch(&*store, &course_id, req, &actor)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok((
        StatusCode::CREATED,
        Json(CreateBranchResponse {
            branch,
            version: VersionResponse::from(version),
        }),
    ))
}

pub async fn get_branch<S: Store>(
    Path((course_id, branch_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<BranchWithTipResponse>, ApiError> {
    let branch = match store.get_branch(&branch_id).await {
        Ok(Some(branch)) if branch.course_id == course_id => branch,
        Ok(_) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("Branch not found")),
            ));
        }
        Err(e) => return Err(upstream_error(e)),
    };
    let tip_version = store
        .get_tip_version(&branch_id)
        .await
        .map_err(upstream_error)?
        .map(VersionResponse::from);
    Ok(Json(BranchWithTipResponse {
        branch,
        tip_version,
    }))
}

/// DELETE /courses/{course_id}/branches/{branch_id}
/// Refused for the default branch, a branch with derived children, or a
/// branch holding the course's active version.
pub async fn delete_branch<S: Store>(
    Path((course_id, branch_id)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    BranchManager::delete_branch(&*store, &course_id, &branch_id)
        .await
        .map_err(domain_error)?;
    invalidate_course_views(&course_id);
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Branch '{}' deleted successfully", branch_id)
    })))
}
