use crate::api::handlers::{ensure_name, not_found};
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::users::CurrentUser;
use crate::api::models::workspaces::{ListWorkspacesQuery, WorkspaceCreate, WorkspaceResponse, WorkspaceUpdate};
use crate::auth::permissions::require_admin;
use crate::db::errors::DbError;
use crate::db::handlers::{Repository, Workspaces, workspaces::WorkspaceFilter};
use crate::db::models::workspaces::{WorkspaceCreateDBRequest, WorkspaceUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{Operation, Resource, WorkspaceId};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/workspaces",
    tag = "workspaces",
    summary = "List workspaces",
    params(ListWorkspacesQuery),
    responses(
        (status = 200, description = "Page of workspaces", body = PaginatedResponse<WorkspaceResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_workspaces(
    State(state): State<AppState>,
    Query(query): Query<ListWorkspacesQuery>,
    _current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<WorkspaceResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = WorkspaceFilter::new(skip, limit)
        .with_is_active(query.is_active)
        .with_search(query.search);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Workspaces::new(&mut conn);
    let total = repo.count(&filter).await?;
    let workspaces = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        workspaces.into_iter().map(WorkspaceResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/workspaces/{id}",
    tag = "workspaces",
    summary = "Get workspace",
    params(("id" = i64, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Workspace", body = WorkspaceResponse),
        (status = 404, description = "Workspace not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(workspace_id = id))]
pub async fn get_workspace(
    State(state): State<AppState>,
    Path(id): Path<WorkspaceId>,
    _current_user: CurrentUser,
) -> Result<Json<WorkspaceResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let workspace = Workspaces::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found("Workspace", id))?;
    Ok(Json(WorkspaceResponse::from(workspace)))
}

#[utoipa::path(
    post,
    path = "/workspaces",
    tag = "workspaces",
    summary = "Create workspace",
    description = "Admin only.",
    request_body = WorkspaceCreate,
    responses(
        (status = 201, description = "Workspace created", body = WorkspaceResponse),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "A workspace with this name already exists"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_workspace(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<WorkspaceCreate>,
) -> Result<(StatusCode, Json<WorkspaceResponse>)> {
    require_admin(&current_user, Operation::CreateAll, Resource::Workspaces)?;
    ensure_name(&create.name)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let workspace = Workspaces::new(&mut conn).create(&WorkspaceCreateDBRequest::from(create)).await?;
    tracing::info!("Created workspace {} ({})", workspace.name, workspace.id);
    Ok((StatusCode::CREATED, Json(WorkspaceResponse::from(workspace))))
}

#[utoipa::path(
    put,
    path = "/workspaces/{id}",
    tag = "workspaces",
    summary = "Update workspace",
    description = "Admin only. Only the supplied fields change.",
    request_body = WorkspaceUpdate,
    params(("id" = i64, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Workspace updated", body = WorkspaceResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Workspace not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(workspace_id = id))]
pub async fn update_workspace(
    State(state): State<AppState>,
    Path(id): Path<WorkspaceId>,
    current_user: CurrentUser,
    Json(update): Json<WorkspaceUpdate>,
) -> Result<Json<WorkspaceResponse>> {
    require_admin(&current_user, Operation::UpdateAll, Resource::Workspaces)?;
    if let Some(name) = &update.name {
        ensure_name(name)?;
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let workspace = Workspaces::new(&mut conn)
        .update(id, &WorkspaceUpdateDBRequest::from(update))
        .await
        .map_err(|e| match e {
            DbError::NotFound => not_found("Workspace", id),
            other => Error::Database(other),
        })?;
    Ok(Json(WorkspaceResponse::from(workspace)))
}

#[utoipa::path(
    delete,
    path = "/workspaces/{id}",
    tag = "workspaces",
    summary = "Delete workspace",
    description = "Admin only. Fails while any record still belongs to the workspace.",
    params(("id" = i64, Path, description = "Workspace ID")),
    responses(
        (status = 204, description = "Workspace deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Workspace not found"),
        (status = 409, description = "Workspace still has records"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(workspace_id = id))]
pub async fn delete_workspace(State(state): State<AppState>, Path(id): Path<WorkspaceId>, current_user: CurrentUser) -> Result<StatusCode> {
    require_admin(&current_user, Operation::DeleteAll, Resource::Workspaces)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Workspaces::new(&mut conn).delete(id).await.map_err(|e| match e {
        DbError::ForeignKeyViolation { .. } => Error::Conflict {
            message: format!("Workspace {id} still has records and cannot be deleted"),
        },
        other => Error::Database(other),
    })?;

    if !deleted {
        return Err(not_found("Workspace", id));
    }
    tracing::info!("Deleted workspace {}", id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::pagination::PaginatedResponse;
    use crate::api::models::users::Role;
    use crate::api::models::workspaces::WorkspaceResponse;
    use crate::test_utils::{add_auth_headers, create_test_app, create_test_user};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_reconciled_store_has_seeded_workspaces(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let page: PaginatedResponse<WorkspaceResponse> = app
            .get("/workspaces?search=sator")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .await
            .json();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].name, "Satoris");
        assert!(page.data[0].is_active);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_only_admins_manage_workspaces(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        app.post("/workspaces")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"name": "North"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = app
            .post("/workspaces")
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .json(&json!({"name": "North", "color": "#10b981"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let workspace: WorkspaceResponse = response.json();
        assert!(workspace.is_active);

        let workspace: WorkspaceResponse = app
            .put(&format!("/workspaces/{}", workspace.id))
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .json(&json!({"is_active": false}))
            .await
            .json();
        assert!(!workspace.is_active);
        assert_eq!(workspace.color.as_deref(), Some("#10b981"));

        let page: PaginatedResponse<WorkspaceResponse> = app
            .get("/workspaces?is_active=false")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .await
            .json();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].name, "North");

        app.put("/workspaces/999999")
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .json(&json!({"name": "Nowhere"}))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_is_restricted_while_referenced(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        let workspace: WorkspaceResponse = app
            .post("/workspaces")
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .json(&json!({"name": "South"}))
            .await
            .json();
        app.post("/deals")
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .json(&json!({"name": "Warehouse", "workspace_id": workspace.id}))
            .await
            .assert_status(StatusCode::CREATED);

        app.delete(&format!("/workspaces/{}", workspace.id))
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .await
            .assert_status(StatusCode::CONFLICT);

        sqlx::query("DELETE FROM deals WHERE workspace_id = $1")
            .bind(workspace.id)
            .execute(&pool)
            .await
            .unwrap();
        app.delete(&format!("/workspaces/{}", workspace.id))
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        app.get(&format!("/workspaces/{}", workspace.id))
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
