use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use taskdeck_server::task::{ListTasksQuery, SortOrder, TaskService, TaskSortBy, TaskStatus};
use testcontainers_modules::{postgres, testcontainers};

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

fn wide_range_query() -> ListTasksQuery {
    ListTasksQuery {
        search: None,
        status: None,
        created_at_start: Utc::now() - Duration::days(365),
        created_at_end: Utc::now() + Duration::days(1),
        page: 1,
        page_size: 100,
        sort_by: TaskSortBy::CreatedAt,
        sort_order: SortOrder::Desc,
    }
}

#[tokio::test]
async fn pagination_splits_25_rows_into_three_pages() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");

    let base: DateTime<Utc> = Utc::now() - Duration::days(30);
    for i in 0..25 {
        common::insert_task(
            &state.db,
            owner.id,
            common::TaskFixture {
                title: format!("Task {i:02}"),
                created_at: base + Duration::hours(i),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to insert task");
    }

    let service = TaskService::new(&state.db);
    let page = service
        .list_tasks(
            owner.id,
            ListTasksQuery {
                page: 2,
                page_size: 10,
                ..wide_range_query()
            },
        )
        .await
        .expect("Failed to list tasks");

    assert_eq!(page.items.len(), 10);
    assert_eq!(page.total_items, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 10);

    let last_page = service
        .list_tasks(
            owner.id,
            ListTasksQuery {
                page: 3,
                page_size: 10,
                ..wide_range_query()
            },
        )
        .await
        .expect("Failed to list tasks");
    assert_eq!(last_page.items.len(), 5);
}

#[tokio::test]
async fn status_filter_returns_only_matching_active_rows() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");

    common::insert_task(
        &state.db,
        owner.id,
        common::TaskFixture {
            title: "Done task".to_string(),
            status: "done",
            ..Default::default()
        },
    )
    .await
    .expect("Failed to insert task");
    common::insert_task(
        &state.db,
        owner.id,
        common::TaskFixture {
            title: "Pending task".to_string(),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to insert task");
    common::insert_task(
        &state.db,
        owner.id,
        common::TaskFixture {
            title: "Deleted done task".to_string(),
            status: "done",
            deleted_at: Some(Utc::now()),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to insert task");

    let service = TaskService::new(&state.db);
    let page = service
        .list_tasks(
            owner.id,
            ListTasksQuery {
                status: Some(TaskStatus::Done),
                ..wide_range_query()
            },
        )
        .await
        .expect("Failed to list tasks");

    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].title, "Done task");
    assert_eq!(page.items[0].status, TaskStatus::Done);
}

#[tokio::test]
async fn search_matches_title_case_insensitively() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");

    for title in ["Write REPORT draft", "Review report figures", "Buy groceries"] {
        common::insert_task(
            &state.db,
            owner.id,
            common::TaskFixture {
                title: title.to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to insert task");
    }

    let service = TaskService::new(&state.db);
    let page = service
        .list_tasks(
            owner.id,
            ListTasksQuery {
                search: Some("report".to_string()),
                ..wide_range_query()
            },
        )
        .await
        .expect("Failed to list tasks");

    assert_eq!(page.total_items, 2);
    assert!(page.items.iter().all(|t| t.title.to_lowercase().contains("report")));
}

#[tokio::test]
async fn created_at_range_bounds_are_inclusive() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");

    let start: DateTime<Utc> = "2025-03-01T00:00:00Z".parse().unwrap();
    let end: DateTime<Utc> = "2025-03-31T00:00:00Z".parse().unwrap();
    for (title, created_at) in [
        ("On the lower bound", start),
        ("On the upper bound", end),
        ("Before the range", start - Duration::seconds(1)),
        ("After the range", end + Duration::seconds(1)),
    ] {
        common::insert_task(
            &state.db,
            owner.id,
            common::TaskFixture {
                title: title.to_string(),
                created_at,
                ..Default::default()
            },
        )
        .await
        .expect("Failed to insert task");
    }

    let service = TaskService::new(&state.db);
    let page = service
        .list_tasks(
            owner.id,
            ListTasksQuery {
                created_at_start: start,
                created_at_end: end,
                ..wide_range_query()
            },
        )
        .await
        .expect("Failed to list tasks");

    let titles: Vec<&str> = page.items.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(page.total_items, 2);
    assert!(titles.contains(&"On the lower bound"));
    assert!(titles.contains(&"On the upper bound"));
}

#[tokio::test]
async fn sorting_by_title_ascending_orders_items() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");

    for title in ["Charlie", "Alpha", "Bravo"] {
        common::insert_task(
            &state.db,
            owner.id,
            common::TaskFixture {
                title: title.to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to insert task");
    }

    let service = TaskService::new(&state.db);
    let page = service
        .list_tasks(
            owner.id,
            ListTasksQuery {
                sort_by: TaskSortBy::Title,
                sort_order: SortOrder::Asc,
                ..wide_range_query()
            },
        )
        .await
        .expect("Failed to list tasks");

    let titles: Vec<&str> = page.items.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha", "Bravo", "Charlie"]);
}

#[tokio::test]
async fn list_is_scoped_to_the_calling_owner() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "Ana", "ana@example.com")
        .await
        .expect("Failed to create user");
    let other = common::create_user(&state.db, "Bia", "bia@example.com")
        .await
        .expect("Failed to create user");

    common::insert_task(&state.db, owner.id, common::TaskFixture::default())
        .await
        .expect("Failed to insert task");
    common::insert_task(&state.db, other.id, common::TaskFixture::default())
        .await
        .expect("Failed to insert task");

    let service = TaskService::new(&state.db);
    let page = service
        .list_tasks(owner.id, wide_range_query())
        .await
        .expect("Failed to list tasks");

    assert_eq!(page.total_items, 1);
    assert!(page.items.iter().all(|t| t.user_id == owner.id));
}
