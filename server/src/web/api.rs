use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
};
use tower::ServiceBuilder;

use crate::{auth, auth::AuthState, task::TaskState, user::UserState};

pub mod v1 {
    use axum::{Json, http::StatusCode, response::IntoResponse};
    use serde::Serialize;
    use utoipa::{OpenApi, ToSchema};

    use crate::task::TaskServiceError;
    use crate::user::UserServiceError;

    /// JSON response body for API errors.
    #[derive(Debug, Serialize, ToSchema)]
    pub struct ErrorResponse {
        pub error: String,
        pub message: String,
    }

    impl ErrorResponse {
        pub fn new(error: &str, message: impl Into<String>) -> Self {
            Self {
                error: error.to_string(),
                message: message.into(),
            }
        }
    }

    /// A single field-level validation failure.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
    pub struct FieldError {
        pub field: String,
        pub message: String,
    }

    impl FieldError {
        pub fn new(field: &str, message: impl Into<String>) -> Self {
            Self {
                field: field.to_string(),
                message: message.into(),
            }
        }
    }

    /// JSON response body for validation errors, carrying per-field messages.
    #[derive(Debug, Serialize, ToSchema)]
    pub struct ValidationErrorResponse {
        pub error: String,
        pub message: String,
        pub fields: Vec<FieldError>,
    }

    /// Error type shared by the v1 JSON handlers.
    #[derive(Debug, thiserror::Error)]
    pub enum ApiError {
        /// Malformed or out-of-range input, rejected before the service runs.
        #[error("Validation failed")]
        Validation(Vec<FieldError>),
        /// The referenced resource is not visible to the caller.
        #[error("{0}")]
        NotFound(String),
        /// An unrecoverable store failure; details stay in the logs.
        #[error("Internal server error")]
        Internal,
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> axum::response::Response {
            match self {
                ApiError::Validation(fields) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(ValidationErrorResponse {
                        error: "VALIDATION_FAILED".to_string(),
                        message: "One or more fields are invalid".to_string(),
                        fields,
                    }),
                )
                    .into_response(),
                ApiError::NotFound(message) => (
                    StatusCode::NOT_FOUND,
                    Json(ErrorResponse::new("NOT_FOUND", message)),
                )
                    .into_response(),
                ApiError::Internal => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(
                        "INTERNAL_SERVER_ERROR",
                        "An unexpected error occurred while processing your request",
                    )),
                )
                    .into_response(),
            }
        }
    }

    impl From<TaskServiceError> for ApiError {
        fn from(err: TaskServiceError) -> Self {
            match err {
                TaskServiceError::TaskNotFound(_) => ApiError::NotFound(err.to_string()),
                TaskServiceError::Database(db_err) => {
                    tracing::error!("Task store failure: {}", db_err);
                    ApiError::Internal
                }
            }
        }
    }

    impl From<UserServiceError> for ApiError {
        fn from(err: UserServiceError) -> Self {
            match err {
                UserServiceError::Database(db_err) => {
                    tracing::error!("User store failure: {}", db_err);
                    ApiError::Internal
                }
            }
        }
    }

    /// OpenAPI document for the v1 JSON API.
    #[derive(OpenApi)]
    #[openapi(
        paths(
            crate::task::api::v1::create_task_handler,
            crate::task::api::v1::update_task_handler,
            crate::task::api::v1::delete_task_handler,
            crate::task::api::v1::list_tasks_handler,
            crate::task::api::v1::dashboard_handler,
            crate::task::api::v1::board_handler,
            crate::user::api::v1::list_users_handler,
        ),
        components(schemas(
            crate::task::Task,
            crate::task::TaskStatus,
            crate::task::TaskPriority,
            crate::task::TaskCategory,
            crate::task::CreateTask,
            crate::task::UpdateTask,
            crate::task::TaskPage,
            crate::task::Dashboard,
            crate::task::DashboardMetrics,
            crate::user::UserSummary,
            crate::user::UserPage,
            ErrorResponse,
            ValidationErrorResponse,
            FieldError,
        )),
        tags(
            (name = "Tasks", description = "Task management endpoints"),
            (name = "Users", description = "User aggregation endpoints"),
        )
    )]
    pub struct ApiDoc;

}

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(
    auth_state: Arc<AuthState>,
    task_state: Arc<TaskState>,
    user_state: Arc<UserState>,
) -> Router {
    let tasks_router = crate::task::api::v1::create_api_router(task_state);
    let users_router = crate::user::api::v1::create_api_router(user_state);
    let protected_routes = tasks_router
        .merge(users_router)
        .layer(ServiceBuilder::new().layer(from_fn(auth::api::v1::require_auth_middleware)));
    Router::new()
        .nest("/api/v1", protected_routes)
        .layer(ServiceBuilder::new().layer(from_fn_with_state(
            auth_state,
            auth::api::v1::auth_user_middleware,
        )))
}
