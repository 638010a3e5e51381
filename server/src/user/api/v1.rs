use axum::{
    Extension, Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::task::api::v1::validate_pagination;
use crate::user::{ListUsersQuery, UserPage, UserService, UserState};
use crate::web::api::v1::{ApiError, ErrorResponse, ValidationErrorResponse};

/// Handler for GET /api/v1/users - Users with their task aggregates.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "One page of user aggregates", body = UserPage),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ValidationErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn list_users_handler(
    State(state): State<Arc<UserState>>,
    Extension(_user): Extension<CurrentUser>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserPage>, ApiError> {
    let mut fields = Vec::new();
    validate_pagination(query.page, query.page_size, &mut fields);
    if !fields.is_empty() {
        return Err(ApiError::Validation(fields));
    }

    let service = UserService::new(&state.db);
    let page = service.list_users(query).await?;
    Ok(Json(page))
}

/// Creates and returns the users API router.
pub fn create_api_router(state: Arc<UserState>) -> Router {
    Router::new()
        .route("/users", get(list_users_handler))
        .with_state(state)
}
