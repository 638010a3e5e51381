use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::task::{
    BoardFilters, CreateTask, Dashboard, ListTasksQuery, Task, TaskPage, TaskService, TaskState,
    TaskStatus, UpdateTask,
};
use crate::web::api::v1::{ApiError, ErrorResponse, FieldError, ValidationErrorResponse};

/// No-filter sentinel the board UI sends in place of an absent status.
/// Translated here; the service layer only ever sees a real status or none.
const BOARD_STATUS_CLEAR: &str = "clear";

/// Query parameters for the board endpoint. Without any parameter the whole
/// active set is returned; with filters a full createdAt range is required.
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BoardQuery {
    pub created_at_start: Option<DateTime<Utc>>,
    pub created_at_end: Option<DateTime<Utc>>,
    /// Case-insensitive substring matched against the title only.
    pub search: Option<String>,
    /// Status value, or the literal `clear` meaning "no status filter".
    pub status: Option<String>,
}

/// Handler for POST /api/v1/tasks - Creates a task owned by the caller.
#[tracing::instrument(skip(state, input))]
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = CreateTask,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ValidationErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    validate_create(&input)?;

    let service = TaskService::new(&state.db);
    let task = service.create_task(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Handler for PUT /api/v1/tasks/{id} - Applies a patch to an owned task.
#[tracing::instrument(skip(state, patch))]
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = UpdateTask,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ValidationErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateTask>,
) -> Result<Json<Task>, ApiError> {
    validate_update(&patch)?;

    let service = TaskService::new(&state.db);
    let task = service.update_task(user.user_id, id, patch).await?;
    Ok(Json(task))
}

/// Handler for DELETE /api/v1/tasks/{id} - Soft-deletes an owned task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let service = TaskService::new(&state.db);
    service.delete_task(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/v1/tasks - Filtered, sorted, paginated task list.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "One page of tasks", body = TaskPage),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ValidationErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<TaskPage>, ApiError> {
    validate_list(&query)?;

    let service = TaskService::new(&state.db);
    let page = service.list_tasks(user.user_id, query).await?;
    Ok(Json(page))
}

/// Handler for GET /api/v1/tasks/dashboard - Dashboard lists and metrics.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/dashboard",
    responses(
        (status = 200, description = "Dashboard payload", body = Dashboard),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn dashboard_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Dashboard>, ApiError> {
    let service = TaskService::new(&state.db);
    let dashboard = service.dashboard(user.user_id).await?;
    Ok(Json(dashboard))
}

/// Handler for GET /api/v1/tasks/board - Kanban board retrieval, optionally
/// filtered. The client groups the returned tasks into columns by status.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/board",
    params(BoardQuery),
    responses(
        (status = 200, description = "Active tasks, newest first", body = [Task]),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ValidationErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn board_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let service = TaskService::new(&state.db);

    let unfiltered = query.created_at_start.is_none()
        && query.created_at_end.is_none()
        && query.search.is_none()
        && query.status.is_none();
    if unfiltered {
        return Ok(Json(service.board(user.user_id).await?));
    }

    let filters = board_filters(query)?;
    Ok(Json(service.board_with_filters(user.user_id, filters).await?))
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route(
            "/tasks",
            axum::routing::post(create_task_handler).get(list_tasks_handler),
        )
        .route("/tasks/dashboard", get(dashboard_handler))
        .route("/tasks/board", get(board_handler))
        .route(
            "/tasks/{id}",
            axum::routing::put(update_task_handler).delete(delete_task_handler),
        )
        .with_state(state)
}

fn validate_create(input: &CreateTask) -> Result<(), ApiError> {
    let mut fields = Vec::new();
    validate_title(&input.title, &mut fields);
    validate_description(input.description.as_deref(), &mut fields);
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(fields))
    }
}

fn validate_update(patch: &UpdateTask) -> Result<(), ApiError> {
    let mut fields = Vec::new();
    validate_title(&patch.title, &mut fields);
    validate_description(patch.description.as_deref(), &mut fields);
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(fields))
    }
}

fn validate_list(query: &ListTasksQuery) -> Result<(), ApiError> {
    let mut fields = Vec::new();
    validate_pagination(query.page, query.page_size, &mut fields);
    if query.created_at_end < query.created_at_start {
        fields.push(FieldError::new(
            "createdAtEnd",
            "End of the createdAt range must not precede its start",
        ));
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(fields))
    }
}

fn validate_title(title: &str, fields: &mut Vec<FieldError>) {
    if title.chars().count() < 3 {
        fields.push(FieldError::new(
            "title",
            "Title must be at least 3 characters",
        ));
    }
}

fn validate_description(description: Option<&str>, fields: &mut Vec<FieldError>) {
    if let Some(description) = description {
        if description.chars().count() > 500 {
            fields.push(FieldError::new(
                "description",
                "Description must be at most 500 characters",
            ));
        }
    }
}

pub(crate) fn validate_pagination(page: u64, page_size: u64, fields: &mut Vec<FieldError>) {
    if page < 1 {
        fields.push(FieldError::new("page", "Page must be at least 1"));
    }
    if !(1..=100).contains(&page_size) {
        fields.push(FieldError::new(
            "pageSize",
            "Page size must be between 1 and 100",
        ));
    }
}

fn board_filters(query: BoardQuery) -> Result<BoardFilters, ApiError> {
    let mut fields = Vec::new();

    let status = match query.status.as_deref() {
        None | Some(BOARD_STATUS_CLEAR) => None,
        Some(value) => match TaskStatus::from_value(value) {
            Some(status) => Some(status),
            None => {
                fields.push(FieldError::new("status", "Unknown status value"));
                None
            }
        },
    };

    let range = match (query.created_at_start, query.created_at_end) {
        (Some(created_at_start), Some(created_at_end)) => {
            if created_at_end < created_at_start {
                fields.push(FieldError::new(
                    "createdAtEnd",
                    "End of the createdAt range must not precede its start",
                ));
            }
            Some((created_at_start, created_at_end))
        }
        (start, end) => {
            if start.is_none() {
                fields.push(FieldError::new(
                    "createdAtStart",
                    "Filtered board requests need a full createdAt range",
                ));
            }
            if end.is_none() {
                fields.push(FieldError::new(
                    "createdAtEnd",
                    "Filtered board requests need a full createdAt range",
                ));
            }
            None
        }
    };

    match range {
        Some((created_at_start, created_at_end)) if fields.is_empty() => Ok(BoardFilters {
            created_at_start,
            created_at_end,
            search: query.search,
            status,
        }),
        _ => Err(ApiError::Validation(fields)),
    }
}
