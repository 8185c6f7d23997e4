use crate::logic::{BranchManager, ContentOperations, MergeWorkflow, VersionLifecycle};
use crate::model::{
    generate_id, ActorContext, Course, CourseBranch, NewBranch, NewMergeRequest, NewResource,
    NewTopic, ResourceContent, ResourceType, ReviewDecision,
};
use crate::store::traits::Store;
use anyhow::Result;

/// Load a small demonstration course: a published curriculum on the default
/// branch, an experimental branch with extra material, and one merged
/// request so every lifecycle state shows up on a dashboard.
pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    let system = ActorContext::system();

    let course_id = generate_id();
    let default_branch = CourseBranch::new_default(course_id.clone(), system.user_id.clone());
    let course = Course::new_with_id(
        course_id,
        "Introduction to Botany".to_string(),
        Some("Plant anatomy, taxonomy, and field identification".to_string()),
        default_branch.id.clone(),
        system.user_id.clone(),
    );
    store.upsert_course(course.clone()).await?;
    store.upsert_branch(default_branch).await?;

    let initial = VersionLifecycle::create_initial_version(
        store,
        &course.id,
        "v1.0.0".to_string(),
        Some("First published curriculum".to_string()),
        &system,
    )
    .await?;

    for (title, description) in [
        ("Plant cells", "Cell walls, chloroplasts, and vacuoles"),
        ("Roots and stems", "Transport tissue and growth patterns"),
        ("Leaves", "Photosynthesis and leaf morphology"),
    ] {
        let topic = ContentOperations::create_topic(
            store,
            &initial.id,
            NewTopic {
                title: title.to_string(),
                description: Some(description.to_string()),
                order_index: None,
            },
        )
        .await?;
        ContentOperations::create_resource(
            store,
            &topic.id,
            NewResource {
                title: format!("{} (lecture slides)", title),
                description: None,
                resource_type: ResourceType::Pdf,
                content: ResourceContent::Link {
                    url: format!(
                        "https://files.example.org/botany/{}.pdf",
                        title.to_lowercase().replace(' ', "-")
                    ),
                },
                order_index: None,
            },
        )
        .await?;
    }

    let (_, experimental_tip) = BranchManager::create_branch(
        store,
        &course.id,
        NewBranch {
            name: "field-module".to_string(),
            description: Some("Trial run of the field identification module".to_string()),
            base_version_id: initial.id.clone(),
            new_version_label: "v1.1.0-field".to_string(),
        },
        &system,
    )
    .await?;
    ContentOperations::create_topic(
        store,
        &experimental_tip.id,
        NewTopic {
            title: "Field identification".to_string(),
            description: Some("Keys and herbarium practice".to_string()),
            order_index: None,
        },
    )
    .await?;

    let request = MergeWorkflow::open(
        store,
        &course.id,
        NewMergeRequest {
            source_branch_id: experimental_tip.branch_id.clone(),
            target_branch_id: course.default_branch_id.clone(),
            title: "Add the field identification module".to_string(),
            summary: Some("Trialled over one semester".to_string()),
            payload: None,
        },
        &system,
    )
    .await?;
    MergeWorkflow::review(store, &request.id, ReviewDecision::Approve, &system).await?;
    MergeWorkflow::merge(store, &request.id, &system).await?;

    log::info!("seed data loaded: course '{}'", course.title);
    Ok(())
}
