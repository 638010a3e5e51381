use chrono::{DateTime, Utc};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, ActiveValue, Database, DatabaseConnection};
use taskdeck_server::entities::{tasks, users};
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, testcontainers};
use uuid::Uuid;

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

pub async fn setup_db(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<DatabaseConnection> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn create_user(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
) -> anyhow::Result<users::Model> {
    let now = Utc::now();
    let active_model = users::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        name: ActiveValue::Set(name.to_string()),
        email: ActiveValue::Set(email.to_string()),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    };
    Ok(active_model.insert(db).await?)
}

/// Raw task row fixture, inserted straight through the entity so tests can
/// control columns the service derives on its own (created_at in particular).
pub struct TaskFixture {
    pub title: String,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Default for TaskFixture {
    fn default() -> Self {
        Self {
            title: "Fixture task".to_string(),
            status: "pending",
            created_at: Utc::now(),
            started_at: None,
            resolved_at: None,
            deadline: None,
            deleted_at: None,
        }
    }
}

pub async fn insert_task(
    db: &DatabaseConnection,
    user_id: Uuid,
    fixture: TaskFixture,
) -> anyhow::Result<tasks::Model> {
    let active_model = tasks::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        user_id: ActiveValue::Set(user_id),
        title: ActiveValue::Set(fixture.title),
        description: ActiveValue::Set(None),
        status: ActiveValue::Set(fixture.status.to_string()),
        priority: ActiveValue::Set(None),
        category: ActiveValue::Set(None),
        created_at: ActiveValue::Set(fixture.created_at),
        updated_at: ActiveValue::Set(fixture.created_at),
        started_at: ActiveValue::Set(fixture.started_at),
        resolved_at: ActiveValue::Set(fixture.resolved_at),
        deadline: ActiveValue::Set(fixture.deadline),
        deleted_at: ActiveValue::Set(fixture.deleted_at),
        ..Default::default()
    };
    Ok(active_model.insert(db).await?)
}
