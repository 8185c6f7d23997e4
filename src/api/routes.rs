use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::{branch_handlers, handlers, merge_handlers};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Course management
        .route("/courses", get(handlers::list_courses::<S>))
        .route("/courses", post(handlers::create_course::<S>))
        .route("/courses/:course_id", get(handlers::get_course::<S>))
        .route("/courses/:course_id", delete(handlers::delete_course::<S>))
        // Version lifecycle
        .route(
            "/courses/:course_id/versions",
            get(handlers::list_versions::<S>),
        )
        .route(
            "/courses/:course_id/versions",
            post(handlers::create_initial_version::<S>),
        )
        .route(
            "/courses/:course_id/versions/:version_id",
            get(handlers::get_version::<S>),
        )
        .route(
            "/courses/:course_id/versions/:version_id/draft",
            post(handlers::create_draft::<S>),
        )
        .route(
            "/courses/:course_id/versions/:version_id/submit",
            post(handlers::submit_version::<S>),
        )
        .route(
            "/courses/:course_id/versions/:version_id/publish",
            post(handlers::publish_version::<S>),
        )
        .route(
            "/courses/:course_id/versions/:version_id/archive",
            post(handlers::archive_version::<S>),
        )
        // Branch management
        .route(
            "/courses/:course_id/branches",
            get(branch_handlers::list_branches::<S>),
        )
        .route(
            "/courses/:course_id/branches",
            post(branch_handlers::create_branch::<S>),
        )
        .route(
            "/courses/:course_id/branches/:branch_id",
            get(branch_handlers::get_branch::<S>),
        )
        .route(
            "/courses/:course_id/branches/:branch_id",
            delete(branch_handlers::delete_branch::<S>),
        )
        // Merge requests
        .route(
            "/courses/:course_id/merge-requests",
            get(merge_handlers::list_merge_requests::<S>),
        )
        .route(
            "/courses/:course_id/merge-requests",
            post(merge_handlers::open_merge_request::<S>),
        )
        .route(
            "/courses/:course_id/merge-requests/:request_id",
            get(merge_handlers::get_merge_request::<S>),
        )
        .route(
            "/courses/:course_id/merge-requests/:request_id/review",
            post(merge_handlers::review_merge_request::<S>),
        )
        .route(
            "/courses/:course_id/merge-requests/:request_id/merge",
            post(merge_handlers::merge_merge_request::<S>),
        )
        // Topic management
        .route(
            "/courses/:course_id/versions/:version_id/topics",
            get(handlers::list_topics::<S>),
        )
        .route(
            "/courses/:course_id/versions/:version_id/topics",
            post(handlers::create_topic::<S>),
        )
        .route(
            "/courses/:course_id/versions/:version_id/topics/reorder",
            post(handlers::reorder_topics::<S>),
        )
        .route("/topics/:topic_id", patch(handlers::update_topic::<S>))
        .route("/topics/:topic_id", delete(handlers::delete_topic::<S>))
        // Resource management
        .route(
            "/topics/:topic_id/resources",
            get(handlers::list_resources::<S>),
        )
        .route(
            "/topics/:topic_id/resources",
            post(handlers::create_resource::<S>),
        )
        .route(
            "/topics/:topic_id/resources/reorder",
            post(handlers::reorder_resources::<S>),
        )
        .route(
            "/resources/:resource_id",
            patch(handlers::update_resource::<S>),
        )
        .route(
            "/resources/:resource_id",
            delete(handlers::delete_resource::<S>),
        )
        // Staff assignments per version
        .route(
            "/courses/:course_id/versions/:version_id/editors",
            get(handlers::list_editors::<S>),
        )
        .route(
            "/courses/:course_id/versions/:version_id/editors",
            post(handlers::assign_editor::<S>),
        )
        .route(
            "/courses/:course_id/versions/:version_id/editors/:assignment_id",
            delete(handlers::remove_editor::<S>),
        )
        // Student progress
        .route(
            "/topics/:topic_id/progress",
            post(handlers::record_progress::<S>),
        )
        .route(
            "/students/:student_id/progress",
            get(handlers::list_student_progress::<S>),
        )
        // The web frontend is served from another origin
        .layer(CorsLayer::permissive())
}
