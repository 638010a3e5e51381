use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::tasks;
use crate::task::dates::{LifecycleDates, derive_lifecycle_dates, today_midnight};

pub mod api;
pub mod dates;

/// How many tasks each dashboard list carries.
const DASHBOARD_LIST_SIZE: u64 = 5;

/// Task lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Holding,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::Holding,
        TaskStatus::InProgress,
        TaskStatus::Done,
    ];

    /// Wire/storage value of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Holding => "holding",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    /// Human-facing label of the status.
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Holding => "On hold",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Done => "Done",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 5] = [
        TaskPriority::VeryLow,
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::VeryHigh,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::VeryLow => "very_low",
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::VeryHigh => "very_high",
        }
    }

    /// Human-facing label of the priority.
    pub fn label(self) -> &'static str {
        match self {
            TaskPriority::VeryLow => "Very low",
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
            TaskPriority::VeryHigh => "Very high",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == value)
    }
}

/// Task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Work,
    Studies,
    Social,
    HealthCare,
    Others,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 5] = [
        TaskCategory::Work,
        TaskCategory::Studies,
        TaskCategory::Social,
        TaskCategory::HealthCare,
        TaskCategory::Others,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::Work => "work",
            TaskCategory::Studies => "studies",
            TaskCategory::Social => "social",
            TaskCategory::HealthCare => "health_care",
            TaskCategory::Others => "others",
        }
    }

    /// Human-facing label of the category.
    pub fn label(self) -> &'static str {
        match self {
            TaskCategory::Work => "Work",
            TaskCategory::Studies => "Studies",
            TaskCategory::Social => "Social",
            TaskCategory::HealthCare => "Health care",
            TaskCategory::Others => "Others",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
    }
}

/// A task as exposed to the API layer. Soft-deleted rows never surface here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    /// Human-facing sequential number assigned by the store.
    pub code: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Option<TaskPriority>,
    pub category: Option<TaskCategory>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}

impl From<tasks::Model> for Task {
    fn from(model: tasks::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            title: model.title,
            status: TaskStatus::from_value(&model.status).unwrap_or_default(),
            priority: model.priority.as_deref().and_then(TaskPriority::from_value),
            category: model.category.as_deref().and_then(TaskCategory::from_value),
            description: model.description,
            user_id: model.user_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
            started_at: model.started_at,
            resolved_at: model.resolved_at,
            deadline: model.deadline,
        }
    }
}

/// Input for creating a task. `status` defaults to `pending` when omitted.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category: Option<TaskCategory>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Patch applied to an existing task.
///
/// Optional fields that are absent leave the stored value untouched; they are
/// never overwritten with a blank just because the caller omitted them.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: String,
    pub status: TaskStatus,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub category: Option<TaskCategory>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Sortable columns for the task list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum TaskSortBy {
    Code,
    Title,
    Status,
    Priority,
    Category,
    #[default]
    CreatedAt,
    StartedAt,
    ResolvedAt,
    Deadline,
}

impl TaskSortBy {
    fn column(self) -> tasks::Column {
        match self {
            TaskSortBy::Code => tasks::Column::Code,
            TaskSortBy::Title => tasks::Column::Title,
            TaskSortBy::Status => tasks::Column::Status,
            TaskSortBy::Priority => tasks::Column::Priority,
            TaskSortBy::Category => tasks::Column::Category,
            TaskSortBy::CreatedAt => tasks::Column::CreatedAt,
            TaskSortBy::StartedAt => tasks::Column::StartedAt,
            TaskSortBy::ResolvedAt => tasks::Column::ResolvedAt,
            TaskSortBy::Deadline => tasks::Column::Deadline,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn order(self) -> Order {
        match self {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    5
}

/// Filter, sort and pagination parameters for the task list.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListTasksQuery {
    /// Case-insensitive substring matched against the title only.
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub created_at_start: DateTime<Utc>,
    pub created_at_end: DateTime<Utc>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default)]
    pub sort_by: TaskSortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// One page of the task list.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub items: Vec<Task>,
    pub total_items: u64,
    pub total_pages: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Filters accepted by the kanban board retrieval.
#[derive(Debug, Clone)]
pub struct BoardFilters {
    pub created_at_start: DateTime<Utc>,
    pub created_at_end: DateTime<Utc>,
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
}

/// Dashboard payload: three most-recent lists plus the metric counts.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub in_progress: Vec<Task>,
    pub completed: Vec<Task>,
    pub delayed: Vec<Task>,
    pub metrics: DashboardMetrics,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub created_last_30_days: u64,
    pub completed_last_30_days: u64,
    pub delayed_not_completed: u64,
    pub holding_not_completed: u64,
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// The task does not exist, is soft-deleted, or belongs to another user.
    /// All three collapse into one error so callers cannot probe for tasks
    /// they do not own.
    #[error("Task {0} not found")]
    TaskNotFound(Uuid),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Shared state for task routes.
#[derive(Clone)]
pub struct TaskState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

pub struct TaskService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TaskService {
        TaskService { db }
    }

    /// Creates a new task owned by `owner_id`.
    ///
    /// The id is generated here, `code` is assigned by the store, and the
    /// lifecycle timestamps are derived from the initial status (a task
    /// created straight in `done` is both started and resolved at once).
    #[tracing::instrument(skip(self, input))]
    pub async fn create_task(
        &self,
        owner_id: Uuid,
        input: CreateTask,
    ) -> Result<Task, TaskServiceError> {
        let status = input.status.unwrap_or_default();
        let lifecycle = derive_lifecycle_dates(status, None);
        let now = Utc::now();

        let active_model = tasks::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(owner_id),
            title: ActiveValue::Set(input.title),
            description: ActiveValue::Set(input.description),
            status: ActiveValue::Set(status.as_str().to_owned()),
            priority: ActiveValue::Set(input.priority.map(|p| p.as_str().to_owned())),
            category: ActiveValue::Set(input.category.map(|c| c.as_str().to_owned())),
            deadline: ActiveValue::Set(input.deadline),
            started_at: ActiveValue::Set(lifecycle.started_at),
            resolved_at: ActiveValue::Set(lifecycle.resolved_at),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db).await?;
        Ok(Task::from(created_model))
    }

    /// Applies a patch to a task owned by `owner_id`.
    ///
    /// Fails with `TaskNotFound` when the task is absent, deleted, or owned
    /// by someone else. Lifecycle timestamps already recorded on the row are
    /// never overwritten, regardless of how the status moves.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_task(
        &self,
        owner_id: Uuid,
        id: Uuid,
        patch: UpdateTask,
    ) -> Result<Task, TaskServiceError> {
        let existing = self.find_owned(owner_id, id).await?;
        let previous = LifecycleDates {
            started_at: existing.started_at,
            resolved_at: existing.resolved_at,
        };
        let lifecycle = derive_lifecycle_dates(patch.status, Some(&previous));

        let mut active_model: tasks::ActiveModel = existing.into();
        active_model.title = ActiveValue::Set(patch.title);
        active_model.status = ActiveValue::Set(patch.status.as_str().to_owned());
        if let Some(description) = patch.description {
            active_model.description = ActiveValue::Set(Some(description));
        }
        if let Some(priority) = patch.priority {
            active_model.priority = ActiveValue::Set(Some(priority.as_str().to_owned()));
        }
        if let Some(category) = patch.category {
            active_model.category = ActiveValue::Set(Some(category.as_str().to_owned()));
        }
        if let Some(deadline) = patch.deadline {
            active_model.deadline = ActiveValue::Set(Some(deadline));
        }
        if let Some(started_at) = lifecycle.started_at {
            active_model.started_at = ActiveValue::Set(Some(started_at));
        }
        if let Some(resolved_at) = lifecycle.resolved_at {
            active_model.resolved_at = ActiveValue::Set(Some(resolved_at));
        }
        let updated_model = active_model.update(self.db).await?;
        Ok(Task::from(updated_model))
    }

    /// Soft-deletes a task owned by `owner_id`.
    ///
    /// The row stays in the store with `deleted_at` set; every read path in
    /// this service filters it out from then on, so a second delete of the
    /// same id fails with `TaskNotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, owner_id: Uuid, id: Uuid) -> Result<(), TaskServiceError> {
        let existing = self.find_owned(owner_id, id).await?;

        let mut active_model: tasks::ActiveModel = existing.into();
        active_model.deleted_at = ActiveValue::Set(Some(Utc::now()));
        active_model.update(self.db).await?;
        Ok(())
    }

    /// Returns one filtered, sorted page of the owner's tasks.
    ///
    /// The count and item queries are built from the same predicate set and
    /// issued concurrently. Under default isolation the two may observe
    /// slightly different snapshots; that transient mismatch is accepted.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(
        &self,
        owner_id: Uuid,
        query: ListTasksQuery,
    ) -> Result<TaskPage, TaskServiceError> {
        let filter = Self::filtered_scope(
            owner_id,
            query.created_at_start,
            query.created_at_end,
            query.status,
            query.search.as_deref(),
        );
        let base = tasks::Entity::find().filter(filter);

        let items_query = base
            .clone()
            .order_by(query.sort_by.column(), query.sort_order.order())
            .offset((query.page - 1) * query.page_size)
            .limit(query.page_size);

        let (total_items, models) =
            tokio::try_join!(base.count(self.db), items_query.all(self.db))?;

        Ok(TaskPage {
            items: models.into_iter().map(Task::from).collect(),
            total_items,
            total_pages: total_items.div_ceil(query.page_size),
            page: query.page,
            page_size: query.page_size,
        })
    }

    /// Computes the dashboard for `owner_id`: the five most-recent tasks in
    /// progress, completed and delayed, plus the rolling 30-day counts.
    /// All seven queries run concurrently.
    #[tracing::instrument(skip(self))]
    pub async fn dashboard(&self, owner_id: Uuid) -> Result<Dashboard, TaskServiceError> {
        let today = today_midnight();
        let window_start = today - Duration::days(30);

        let in_progress_query = tasks::Entity::find()
            .filter(
                Self::active_scope(owner_id)
                    .add(tasks::Column::Status.eq(TaskStatus::InProgress.as_str())),
            )
            .order_by_desc(tasks::Column::CreatedAt)
            .limit(DASHBOARD_LIST_SIZE);

        let completed_query = tasks::Entity::find()
            .filter(
                Self::active_scope(owner_id)
                    .add(tasks::Column::Status.eq(TaskStatus::Done.as_str())),
            )
            .order_by_desc(tasks::Column::ResolvedAt)
            .limit(DASHBOARD_LIST_SIZE);

        let delayed_query = tasks::Entity::find()
            .filter(Self::delayed_scope(owner_id, today))
            .order_by_desc(tasks::Column::Deadline)
            .limit(DASHBOARD_LIST_SIZE);

        let created_last_30_days = tasks::Entity::find()
            .filter(Self::active_scope(owner_id).add(tasks::Column::CreatedAt.gt(window_start)))
            .count(self.db);

        // Counts tasks by when they were resolved, not when they were
        // created: a task created 40 days ago and resolved yesterday counts.
        let completed_last_30_days = tasks::Entity::find()
            .filter(
                Self::active_scope(owner_id)
                    .add(tasks::Column::Status.eq(TaskStatus::Done.as_str()))
                    .add(tasks::Column::ResolvedAt.gt(window_start)),
            )
            .count(self.db);

        let delayed_not_completed = tasks::Entity::find()
            .filter(Self::delayed_scope(owner_id, today))
            .count(self.db);

        let holding_not_completed = tasks::Entity::find()
            .filter(
                Self::active_scope(owner_id)
                    .add(tasks::Column::Status.eq(TaskStatus::Holding.as_str()))
                    .add(tasks::Column::ResolvedAt.is_null()),
            )
            .count(self.db);

        let (
            in_progress,
            completed,
            delayed,
            created_last_30_days,
            completed_last_30_days,
            delayed_not_completed,
            holding_not_completed,
        ) = tokio::try_join!(
            in_progress_query.all(self.db),
            completed_query.all(self.db),
            delayed_query.all(self.db),
            created_last_30_days,
            completed_last_30_days,
            delayed_not_completed,
            holding_not_completed,
        )?;

        Ok(Dashboard {
            in_progress: in_progress.into_iter().map(Task::from).collect(),
            completed: completed.into_iter().map(Task::from).collect(),
            delayed: delayed.into_iter().map(Task::from).collect(),
            metrics: DashboardMetrics {
                created_last_30_days,
                completed_last_30_days,
                delayed_not_completed,
                holding_not_completed,
            },
        })
    }

    /// Returns all of the owner's active tasks, newest first, without
    /// pagination. The client groups them into board columns by status.
    #[tracing::instrument(skip(self))]
    pub async fn board(&self, owner_id: Uuid) -> Result<Vec<Task>, TaskServiceError> {
        let models = tasks::Entity::find()
            .filter(Self::active_scope(owner_id))
            .order_by_desc(tasks::Column::CreatedAt)
            .all(self.db)
            .await?;
        Ok(models.into_iter().map(Task::from).collect())
    }

    /// Board retrieval with the same filter predicates as the list view,
    /// minus sorting and pagination.
    #[tracing::instrument(skip(self))]
    pub async fn board_with_filters(
        &self,
        owner_id: Uuid,
        filters: BoardFilters,
    ) -> Result<Vec<Task>, TaskServiceError> {
        let filter = Self::filtered_scope(
            owner_id,
            filters.created_at_start,
            filters.created_at_end,
            filters.status,
            filters.search.as_deref(),
        );
        let models = tasks::Entity::find()
            .filter(filter)
            .order_by_desc(tasks::Column::CreatedAt)
            .all(self.db)
            .await?;
        Ok(models.into_iter().map(Task::from).collect())
    }

    /// Loads a task by id scoped to its owner and excluding deleted rows.
    async fn find_owned(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<tasks::Model, TaskServiceError> {
        tasks::Entity::find_by_id(id)
            .filter(tasks::Column::UserId.eq(owner_id))
            .filter(tasks::Column::DeletedAt.is_null())
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    /// Base predicate every read shares: owner-scoped, soft-deletes excluded.
    fn active_scope(owner_id: Uuid) -> Condition {
        Condition::all()
            .add(tasks::Column::UserId.eq(owner_id))
            .add(tasks::Column::DeletedAt.is_null())
    }

    /// Predicate set shared by the list and the filtered board. Built in one
    /// place so the concurrent count and item queries can never diverge.
    fn filtered_scope(
        owner_id: Uuid,
        created_at_start: DateTime<Utc>,
        created_at_end: DateTime<Utc>,
        status: Option<TaskStatus>,
        search: Option<&str>,
    ) -> Condition {
        let mut condition = Self::active_scope(owner_id)
            .add(tasks::Column::CreatedAt.between(created_at_start, created_at_end));
        if let Some(status) = status {
            condition = condition.add(tasks::Column::Status.eq(status.as_str()));
        }
        if let Some(search) = search {
            condition =
                condition.add(Expr::col(tasks::Column::Title).ilike(format!("%{search}%")));
        }
        condition
    }

    /// A task is delayed when it is active, unresolved, and its deadline lies
    /// before today's midnight.
    fn delayed_scope(owner_id: Uuid, today: DateTime<Utc>) -> Condition {
        Self::active_scope(owner_id)
            .add(tasks::Column::ResolvedAt.is_null())
            .add(tasks::Column::Deadline.is_not_null())
            .add(tasks::Column::Deadline.lt(today))
    }
}
