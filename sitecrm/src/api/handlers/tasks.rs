use crate::api::handlers::{ensure_name, not_found};
use crate::api::models::tasks::{TaskCreate, TaskResponse, TaskUpdate, ListTasksQuery};
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::pipeline::ensure_transition;
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{ensure_can_assign, ensure_visible, resolve_new_owner, visibility_scope};
use crate::db::handlers::{Tasks, Repository, tasks::TaskFilter, filters::ScopeFilter};
use crate::db::models::tasks::{TaskCreateDBRequest, TaskUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{TaskId, Operation, Resource};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    summary = "List tasks",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "Page of tasks", body = PaginatedResponse<TaskResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<TaskResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = TaskFilter {
        skip,
        limit,
        scope: ScopeFilter {
            workspace_id: query.workspace_id,
            owner_name: query.owner_name,
            search: query.search,
            visible_to: visibility_scope(&current_user),
        },
        status: query.status,
        priority: query.priority,
        task_type: query.task_type,
        deal_id: query.deal_id,
        lead_id: query.lead_id,
        account_id: query.account_id,
        contact_id: query.contact_id,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tasks::new(&mut conn);
    let total = repo.count(&filter).await?;
    let rows = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(TaskResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "tasks",
    summary = "Get task",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task", body = TaskResponse),
        (status = 404, description = "Task not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(task_id = id))]
pub async fn get_task(State(state): State<AppState>, Path(id): Path<TaskId>, current_user: CurrentUser) -> Result<Json<TaskResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let task = Tasks::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found("Task", id))?;
    ensure_visible(&current_user, task.owner_id, "Task", id)?;
    Ok(Json(TaskResponse::from(task)))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "tasks",
    summary = "Create task",
    request_body = TaskCreate,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Invalid request or duplicate monday_item_id"),
        (status = 403, description = "Cannot assign the task to another user"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<TaskCreate>,
) -> Result<(StatusCode, Json<TaskResponse>)> {
    ensure_name(&create.name)?;
    let (owner_id, owner_name) = resolve_new_owner(&current_user, create.owner_id, create.owner_name.clone(), Resource::Tasks)?;

    let request = TaskCreateDBRequest {
        owner_id: Some(owner_id),
        owner_name,
        ..TaskCreateDBRequest::from(create)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let task = Tasks::new(&mut conn).create(&request).await?;
    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "tasks",
    summary = "Update task",
    description = "Only the supplied fields change. Status changes must follow the task workflow.",
    request_body = TaskUpdate,
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Invalid status transition"),
        (status = 403, description = "Cannot assign the task to another user"),
        (status = 404, description = "Task not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(task_id = id))]
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    current_user: CurrentUser,
    Json(update): Json<TaskUpdate>,
) -> Result<Json<TaskResponse>> {
    if let Some(name) = &update.name {
        ensure_name(name)?;
    }
    ensure_can_assign(&current_user, update.owner_id, Operation::UpdateOwn, Resource::Tasks)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tasks::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Task", id))?;
    ensure_visible(&current_user, existing.owner_id, "Task", id)?;
    if let Some(status) = update.status {
        ensure_transition(existing.status, status)?;
    }

    let task = repo.update(id, &TaskUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(TaskResponse::from(task)))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "tasks",
    summary = "Delete task",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Task not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(task_id = id))]
pub async fn delete_task(State(state): State<AppState>, Path(id): Path<TaskId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tasks::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Task", id))?;
    ensure_visible(&current_user, existing.owner_id, "Task", id)?;
    repo.delete(id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::deals::DealResponse;
    use crate::api::models::pagination::PaginatedResponse;
    use crate::api::models::pipeline::TaskStatus;
    use crate::api::models::tasks::TaskResponse;
    use crate::api::models::users::Role;
    use crate::test_utils::{add_auth_headers, create_test_app, create_test_user};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_tasks_linked_to_deal(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let deal: DealResponse = app
            .post("/deals")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"name": "Fit-out"}))
            .await
            .json();

        let response = app
            .post("/tasks")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"name": "Send proposal", "deal_id": deal.id, "due_date": "2025-01-31"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let task: TaskResponse = response.json();
        assert_eq!(task.status, TaskStatus::ToDo);

        app.post("/tasks")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"name": "Unrelated"}))
            .await
            .assert_status(StatusCode::CREATED);

        let page: PaginatedResponse<TaskResponse> = app
            .get(&format!("/tasks?deal_id={}", deal.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .await
            .json();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, task.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_done_task_must_be_reopened(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let task: TaskResponse = app
            .post("/tasks")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"name": "Chase invoice", "status": "Done"}))
            .await
            .json();

        app.put(&format!("/tasks/{}", task.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"status": "Stuck"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let task: TaskResponse = app
            .put(&format!("/tasks/{}", task.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"status": "Working on it"}))
            .await
            .json();
        assert!(task.status.is_open());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_hides_other_users_task(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let alice = create_test_user(&pool, Role::User).await;
        let bob = create_test_user(&pool, Role::User).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        let task: TaskResponse = app
            .post("/tasks")
            .add_header(add_auth_headers(&alice).0, add_auth_headers(&alice).1)
            .json(&json!({"name": "Call back"}))
            .await
            .json();

        app.get(&format!("/tasks/{}", task.id))
            .add_header(add_auth_headers(&bob).0, add_auth_headers(&bob).1)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let own: TaskResponse = app
            .get(&format!("/tasks/{}", task.id))
            .add_header(add_auth_headers(&alice).0, add_auth_headers(&alice).1)
            .await
            .json();
        assert_eq!(own.id, task.id);

        app.get(&format!("/tasks/{}", task.id))
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .await
            .assert_status_ok();
    }
}
