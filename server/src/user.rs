use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Func, IntoCondition, SimpleExpr};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::{tasks, users};
use crate::task::TaskStatus;
use crate::task::dates::today_midnight;

pub mod api;

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    5
}

/// Filter and pagination parameters for the user listing.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Case-insensitive substring matched against the user name.
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

/// Per-user task aggregates with derived completion and delay rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub delayed_tasks: u64,
    pub in_progress_tasks: u64,
    /// Percentage of completed tasks, rounded; 0 when the user has no tasks.
    pub completed_rate: u32,
    /// Percentage of delayed tasks, rounded; 0 when the user has no tasks.
    pub delayed_rate: u32,
}

/// One page of the user listing.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub items: Vec<UserSummary>,
    pub total_items: u64,
    pub total_pages: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Raw row shape of the grouped aggregate query.
#[derive(Debug, FromQueryResult)]
struct UserTaskCounts {
    user_id: Uuid,
    name: String,
    email: String,
    total_tasks: i64,
    completed_tasks: Option<i64>,
    delayed_tasks: Option<i64>,
    in_progress_tasks: Option<i64>,
}

/// Error type for UserService operations.
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Shared state for user routes.
#[derive(Clone)]
pub struct UserState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

pub struct UserService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl UserService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> UserService {
        UserService { db }
    }

    /// Lists users with their task aggregates, one grouped left-join query
    /// per page plus a concurrent total count.
    ///
    /// Soft-deleted tasks are excluded from every sub-count via the join
    /// condition, and the delayed sub-count uses the same definition as the
    /// task-level delayed predicate: unresolved with a deadline before
    /// today's midnight. Ordered by name descending, as the UI expects.
    #[tracing::instrument(skip(self))]
    pub async fn list_users(&self, query: ListUsersQuery) -> Result<UserPage, UserServiceError> {
        let today = today_midnight();

        let mut items_query = users::Entity::find()
            .select_only()
            .expr_as(Expr::col((users::Entity, users::Column::Id)), "user_id")
            .expr_as(Expr::col((users::Entity, users::Column::Name)), "name")
            .expr_as(Expr::col((users::Entity, users::Column::Email)), "email")
            .expr_as(
                Expr::col((tasks::Entity, tasks::Column::Id)).count(),
                "total_tasks",
            )
            .expr_as(
                count_matching(
                    Expr::col((tasks::Entity, tasks::Column::Status))
                        .eq(TaskStatus::Done.as_str()),
                ),
                "completed_tasks",
            )
            .expr_as(
                count_matching(
                    Expr::col((tasks::Entity, tasks::Column::Deadline))
                        .is_not_null()
                        .and(Expr::col((tasks::Entity, tasks::Column::Deadline)).lt(today))
                        .and(Expr::col((tasks::Entity, tasks::Column::ResolvedAt)).is_null()),
                ),
                "delayed_tasks",
            )
            .expr_as(
                count_matching(
                    Expr::col((tasks::Entity, tasks::Column::Status))
                        .eq(TaskStatus::InProgress.as_str()),
                ),
                "in_progress_tasks",
            )
            .join(
                JoinType::LeftJoin,
                users::Relation::Tasks
                    .def()
                    .on_condition(|_left, _right| {
                        tasks::Column::DeletedAt.is_null().into_condition()
                    }),
            )
            .group_by(users::Column::Id)
            .order_by_desc(users::Column::Name)
            .offset((query.page - 1) * query.page_size)
            .limit(query.page_size);

        let mut count_query = users::Entity::find();

        if let Some(search) = &query.search {
            items_query = items_query.filter(name_filter(search));
            count_query = count_query.filter(name_filter(search));
        }

        let (total_items, rows) = tokio::try_join!(
            count_query.count(self.db),
            items_query.into_model::<UserTaskCounts>().all(self.db),
        )?;

        Ok(UserPage {
            items: rows.into_iter().map(UserSummary::from).collect(),
            total_items,
            total_pages: total_items.div_ceil(query.page_size),
            page: query.page,
            page_size: query.page_size,
        })
    }
}

impl From<UserTaskCounts> for UserSummary {
    fn from(row: UserTaskCounts) -> Self {
        let total = row.total_tasks.max(0) as u64;
        let completed = row.completed_tasks.unwrap_or(0).max(0) as u64;
        let delayed = row.delayed_tasks.unwrap_or(0).max(0) as u64;
        let in_progress = row.in_progress_tasks.unwrap_or(0).max(0) as u64;

        Self {
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            total_tasks: total,
            completed_tasks: completed,
            delayed_tasks: delayed,
            in_progress_tasks: in_progress,
            completed_rate: rate(completed, total),
            delayed_rate: rate(delayed, total),
        }
    }
}

/// Case-insensitive substring match on the user name.
fn name_filter(search: &str) -> SimpleExpr {
    Expr::col((users::Entity, users::Column::Name)).ilike(format!("%{search}%"))
}

/// `SUM(CASE WHEN <condition> THEN 1 ELSE 0 END)` — a conditional count that
/// stays at zero for users whose left join produced no task rows.
fn count_matching(condition: SimpleExpr) -> SimpleExpr {
    Func::sum(Expr::case(condition, Expr::val(1)).finally(Expr::val(0))).into()
}

/// Rounded percentage of `part` over `total`, 0 when `total` is 0.
fn rate(part: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}
