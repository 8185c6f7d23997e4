use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use coursetree::api::routes::create_router;
use coursetree::store::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

fn test_app() -> Router {
    create_router().with_state(Arc::new(MemoryStore::new()))
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    actor: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", actor);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = test_app();
    let (status, body) = request(&app, "GET", "/health", "admin", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn initial_version_scenario() {
    let app = test_app();

    let (status, course) = request(
        &app,
        "POST",
        "/courses",
        "admin",
        Some(json!({"title": "Intro", "description": "An introductory course"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let course_id = course["id"].as_str().unwrap().to_string();
    assert!(course["default_branch_id"].is_string());
    assert!(course["active_version_id"].is_null());

    let (status, version) = request(
        &app,
        "POST",
        &format!("/courses/{}/versions", course_id),
        "admin",
        Some(json!({"version_label": "v1.0.0"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(version["status"], "published");
    assert_eq!(version["is_active"], true);
    assert_eq!(version["is_published"], true);
    assert_eq!(version["is_tip"], true);

    let (_, course) = request(
        &app,
        "GET",
        &format!("/courses/{}", course_id),
        "admin",
        None,
    )
    .await;
    assert_eq!(course["active_version_id"], version["id"]);

    // A second initial version is refused while one is active
    let (status, _) = request(
        &app,
        "POST",
        &format!("/courses/{}/versions", course_id),
        "admin",
        Some(json!({"version_label": "v2.0.0"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn branch_topics_and_ordering_scenario() {
    let app = test_app();
    let (_, course) = request(
        &app,
        "POST",
        "/courses",
        "admin",
        Some(json!({"title": "Intro"})),
    )
    .await;
    let course_id = course["id"].as_str().unwrap().to_string();
    let (_, initial) = request(
        &app,
        "POST",
        &format!("/courses/{}/versions", course_id),
        "admin",
        Some(json!({"version_label": "v1.0.0"})),
    )
    .await;
    let initial_id = initial["id"].as_str().unwrap().to_string();

    let (status, branch_response) = request(
        &app,
        "POST",
        &format!("/courses/{}/branches", course_id),
        "teacher-1",
        Some(json!({
            "name": "experimental",
            "base_version_id": initial_id,
            "new_version_label": "v1.1.0-exp"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(branch_response["version"]["status"], "draft");
    assert_eq!(branch_response["version"]["is_tip"], true);
    let draft_id = branch_response["version"]["id"].as_str().unwrap().to_string();

    // Three topics with no explicit order land at 1, 2, 3
    let mut topic_ids = Vec::new();
    for title in ["A", "B", "C"] {
        let (status, topic) = request(
            &app,
            "POST",
            &format!("/courses/{}/versions/{}/topics", course_id, draft_id),
            "teacher-1",
            Some(json!({"title": title})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        topic_ids.push(topic["id"].as_str().unwrap().to_string());
    }
    let (_, topics) = request(
        &app,
        "GET",
        &format!("/courses/{}/versions/{}/topics", course_id, draft_id),
        "teacher-1",
        None,
    )
    .await;
    let orders: Vec<i64> = topics["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["order_index"].as_i64().unwrap())
        .collect();
    assert_eq!(orders, vec![1, 2, 3]);

    // [A,B,C] -> [C,A,B]
    let (status, reordered) = request(
        &app,
        "POST",
        &format!(
            "/courses/{}/versions/{}/topics/reorder",
            course_id, draft_id
        ),
        "teacher-1",
        Some(json!({"items": [
            {"id": topic_ids[2], "order_index": 1},
            {"id": topic_ids[0], "order_index": 2},
            {"id": topic_ids[1], "order_index": 3},
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = reordered["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["C", "A", "B"]);
}

#[tokio::test]
async fn merge_request_scenario() {
    let app = test_app();
    let (_, course) = request(
        &app,
        "POST",
        "/courses",
        "admin",
        Some(json!({"title": "Intro"})),
    )
    .await;
    let course_id = course["id"].as_str().unwrap().to_string();
    let default_branch_id = course["default_branch_id"].as_str().unwrap().to_string();
    let (_, initial) = request(
        &app,
        "POST",
        &format!("/courses/{}/versions", course_id),
        "admin",
        Some(json!({"version_label": "v1.0.0"})),
    )
    .await;
    let initial_id = initial["id"].as_str().unwrap().to_string();

    let (_, branch_response) = request(
        &app,
        "POST",
        &format!("/courses/{}/branches", course_id),
        "teacher-1",
        Some(json!({
            "name": "experimental",
            "base_version_id": initial_id,
            "new_version_label": "v1.1.0-exp"
        })),
    )
    .await;
    let feature_branch_id = branch_response["branch"]["id"].as_str().unwrap().to_string();
    let feature_version_id = branch_response["version"]["id"].as_str().unwrap().to_string();

    let (status, opened) = request(
        &app,
        "POST",
        &format!("/courses/{}/merge-requests", course_id),
        "teacher-1",
        Some(json!({
            "source_branch_id": feature_branch_id,
            "target_branch_id": default_branch_id,
            "title": "Fold experiment back"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(opened["status"], "open");
    let request_id = opened["id"].as_str().unwrap().to_string();

    let (status, approved) = request(
        &app,
        "POST",
        &format!("/courses/{}/merge-requests/{}/review", course_id, request_id),
        "reviewer-1",
        Some(json!({"decision": "approve"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let (status, merged) = request(
        &app,
        "POST",
        &format!("/courses/{}/merge-requests/{}/merge", course_id, request_id),
        "reviewer-1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merged["request"]["status"], "merged");
    assert_eq!(merged["new_version"]["status"], "published");
    assert_eq!(merged["new_version"]["is_active"], true);
    let new_version_id = merged["new_version"]["id"].as_str().unwrap().to_string();

    // Course pointer moved to the merged version
    let (_, course) = request(
        &app,
        "GET",
        &format!("/courses/{}", course_id),
        "admin",
        None,
    )
    .await;
    assert_eq!(course["active_version_id"], new_version_id.as_str());

    // Old default-branch version was unseated
    let (_, old) = request(
        &app,
        "GET",
        &format!("/courses/{}/versions/{}", course_id, initial_id),
        "admin",
        None,
    )
    .await;
    assert_eq!(old["is_active"], false);
    assert_eq!(old["status"], "archived");

    // Source version was consumed
    let (_, source) = request(
        &app,
        "GET",
        &format!("/courses/{}/versions/{}", course_id, feature_version_id),
        "admin",
        None,
    )
    .await;
    assert_eq!(source["merged_into_version_id"], new_version_id.as_str());

    // The closed request refuses a second merge
    let (status, _) = request(
        &app,
        "POST",
        &format!("/courses/{}/merge-requests/{}/merge", course_id, request_id),
        "reviewer-1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn branch_deletion_rules() {
    let app = test_app();
    let (_, course) = request(
        &app,
        "POST",
        "/courses",
        "admin",
        Some(json!({"title": "Intro"})),
    )
    .await;
    let course_id = course["id"].as_str().unwrap().to_string();
    let default_branch_id = course["default_branch_id"].as_str().unwrap().to_string();
    let (_, initial) = request(
        &app,
        "POST",
        &format!("/courses/{}/versions", course_id),
        "admin",
        Some(json!({"version_label": "v1.0.0"})),
    )
    .await;
    let initial_id = initial["id"].as_str().unwrap().to_string();

    // The default branch is protected
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/courses/{}/branches/{}", course_id, default_branch_id),
        "admin",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, branch_response) = request(
        &app,
        "POST",
        &format!("/courses/{}/branches", course_id),
        "admin",
        Some(json!({
            "name": "experimental",
            "base_version_id": initial_id,
            "new_version_label": "v1.1.0-exp"
        })),
    )
    .await;
    let branch_id = branch_response["branch"]["id"].as_str().unwrap().to_string();
    let branch_version_id = branch_response["version"]["id"].as_str().unwrap().to_string();

    // A side branch with no children and no active version deletes cleanly
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/courses/{}/branches/{}", course_id, branch_id),
        "admin",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app,
        "GET",
        &format!("/courses/{}/versions/{}", course_id, branch_version_id),
        "admin",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn student_progress_flow() {
    let app = test_app();
    let (_, course) = request(
        &app,
        "POST",
        "/courses",
        "admin",
        Some(json!({"title": "Intro"})),
    )
    .await;
    let course_id = course["id"].as_str().unwrap().to_string();
    let (_, initial) = request(
        &app,
        "POST",
        &format!("/courses/{}/versions", course_id),
        "admin",
        Some(json!({"version_label": "v1.0.0"})),
    )
    .await;
    let version_id = initial["id"].as_str().unwrap().to_string();
    let (_, topic) = request(
        &app,
        "POST",
        &format!("/courses/{}/versions/{}/topics", course_id, version_id),
        "admin",
        Some(json!({"title": "Week 1"})),
    )
    .await;
    let topic_id = topic["id"].as_str().unwrap().to_string();

    // First access creates the row
    let (status, progress) = request(
        &app,
        "POST",
        &format!("/topics/{}/progress", topic_id),
        "student-1",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["completed"], false);

    // Completion toggles on the same row
    let (_, progress) = request(
        &app,
        "POST",
        &format!("/topics/{}/progress", topic_id),
        "student-1",
        Some(json!({"completed": true})),
    )
    .await;
    assert_eq!(progress["completed"], true);
    assert!(progress["completed_at"].is_string());

    let (_, rows) = request(&app, "GET", "/students/student-1/progress", "student-1", None).await;
    assert_eq!(rows["total"], 1);
}
