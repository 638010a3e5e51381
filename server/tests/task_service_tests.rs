use sea_orm::DatabaseConnection;
use taskdeck_server::task::{
    CreateTask, TaskService, TaskServiceError, TaskStatus, UpdateTask,
};
use testcontainers_modules::{postgres, testcontainers};
use uuid::Uuid;

mod common;

pub struct TestContext {
    #[allow(dead_code)] // container is kept to ensure it's not dropped
    pub container: testcontainers::ContainerAsync<postgres::Postgres>,
    pub db: DatabaseConnection,
}

async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let container = common::setup_container().await?;
    let db = common::setup_db(&container).await?;
    Ok(TestContext { db, container })
}

fn create_input(title: &str, status: Option<TaskStatus>) -> CreateTask {
    CreateTask {
        title: title.to_string(),
        description: None,
        status,
        priority: None,
        category: None,
        deadline: None,
    }
}

fn patch(title: &str, status: TaskStatus) -> UpdateTask {
    UpdateTask {
        title: title.to_string(),
        status,
        description: None,
        priority: None,
        category: None,
        deadline: None,
    }
}

#[tokio::test]
async fn created_task_defaults_to_pending_without_lifecycle_dates() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");
    let service = TaskService::new(&state.db);

    let task = service
        .create_task(owner.id, create_input("Plan the week", None))
        .await
        .expect("Failed to create task");

    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.started_at, None);
    assert_eq!(task.resolved_at, None);
    assert_eq!(task.user_id, owner.id);
    assert!(task.code >= 1);
}

#[tokio::test]
async fn task_created_done_gets_both_lifecycle_dates_at_once() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");
    let service = TaskService::new(&state.db);

    let task = service
        .create_task(owner.id, create_input("Retrospective", Some(TaskStatus::Done)))
        .await
        .expect("Failed to create task");

    assert_eq!(task.started_at, task.resolved_at);
    assert!(task.started_at.is_some());
}

#[tokio::test]
async fn lifecycle_dates_survive_status_oscillation() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");
    let service = TaskService::new(&state.db);

    let created = service
        .create_task(owner.id, create_input("Quarterly report", None))
        .await
        .expect("Failed to create task");
    assert_eq!(created.started_at, None);
    assert_eq!(created.resolved_at, None);

    // pending -> in_progress sets started_at only.
    let started = service
        .update_task(owner.id, created.id, patch("Quarterly report", TaskStatus::InProgress))
        .await
        .expect("Failed to update task");
    let started_at = started.started_at.expect("started_at should be set");
    assert_eq!(started.resolved_at, None);

    // in_progress -> done sets resolved_at, keeps started_at.
    let resolved = service
        .update_task(owner.id, created.id, patch("Quarterly report", TaskStatus::Done))
        .await
        .expect("Failed to update task");
    assert_eq!(resolved.started_at, Some(started_at));
    let resolved_at = resolved.resolved_at.expect("resolved_at should be set");

    // done -> pending leaves both untouched.
    let reverted = service
        .update_task(owner.id, created.id, patch("Quarterly report", TaskStatus::Pending))
        .await
        .expect("Failed to update task");
    assert_eq!(reverted.status, TaskStatus::Pending);
    assert_eq!(reverted.started_at, Some(started_at));
    assert_eq!(reverted.resolved_at, Some(resolved_at));
}

#[tokio::test]
async fn update_patch_leaves_omitted_fields_untouched() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");
    let service = TaskService::new(&state.db);

    let created = service
        .create_task(
            owner.id,
            CreateTask {
                description: Some("Numbers for Q3".to_string()),
                deadline: Some("2025-09-30T00:00:00Z".parse().unwrap()),
                ..create_input("Quarterly report", None)
            },
        )
        .await
        .expect("Failed to create task");

    let updated = service
        .update_task(owner.id, created.id, patch("Quarterly report v2", TaskStatus::Holding))
        .await
        .expect("Failed to update task");

    assert_eq!(updated.title, "Quarterly report v2");
    assert_eq!(updated.description, Some("Numbers for Q3".to_string()));
    assert_eq!(updated.deadline, created.deadline);
}

#[tokio::test]
async fn update_for_foreign_owner_yields_not_found() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");
    let other = common::create_user(&state.db, "Bia", "bia@example.com")
        .await
        .expect("Failed to create user");
    let service = TaskService::new(&state.db);

    let created = service
        .create_task(owner.id, create_input("Private task", None))
        .await
        .expect("Failed to create task");

    let result = service
        .update_task(other.id, created.id, patch("Hijacked", TaskStatus::Done))
        .await;
    assert!(matches!(result, Err(TaskServiceError::TaskNotFound(id)) if id == created.id));
}

#[tokio::test]
async fn delete_for_foreign_owner_yields_not_found() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");
    let other = common::create_user(&state.db, "Bia", "bia@example.com")
        .await
        .expect("Failed to create user");
    let service = TaskService::new(&state.db);

    let created = service
        .create_task(owner.id, create_input("Private task", None))
        .await
        .expect("Failed to create task");

    let result = service.delete_task(other.id, created.id).await;
    assert!(matches!(result, Err(TaskServiceError::TaskNotFound(_))));
}

#[tokio::test]
async fn deleted_task_is_gone_for_updates_and_second_deletes() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");
    let service = TaskService::new(&state.db);

    let created = service
        .create_task(owner.id, create_input("Disposable task", None))
        .await
        .expect("Failed to create task");

    service
        .delete_task(owner.id, created.id)
        .await
        .expect("Failed to delete task");

    let update_result = service
        .update_task(owner.id, created.id, patch("Too late", TaskStatus::Done))
        .await;
    assert!(matches!(
        update_result,
        Err(TaskServiceError::TaskNotFound(_))
    ));

    let second_delete = service.delete_task(owner.id, created.id).await;
    assert!(matches!(
        second_delete,
        Err(TaskServiceError::TaskNotFound(_))
    ));
}

#[tokio::test]
async fn missing_task_yields_not_found() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");
    let service = TaskService::new(&state.db);

    let result = service
        .update_task(owner.id, Uuid::new_v4(), patch("Ghost", TaskStatus::Pending))
        .await;
    assert!(matches!(result, Err(TaskServiceError::TaskNotFound(_))));
}
