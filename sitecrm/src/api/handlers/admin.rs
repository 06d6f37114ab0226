use crate::api::models::checklists::{ChecklistResponse, ListChecklistsQuery};
use crate::api::models::pagination::{PaginatedResponse, Pagination};
use crate::api::models::users::{CurrentUser, UserResponse, UserWithChecklistCount};
use crate::auth::permissions::require_admin;
use crate::db::handlers::{Checklists, Repository, Users, checklists::ChecklistFilter, users::UserFilter};
use crate::errors::{Error, Result};
use crate::types::{Operation, Resource};
use crate::AppState;
use axum::{
    Json,
    extract::{Query, State},
};

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    summary = "List users with survey counts",
    params(Pagination),
    responses(
        (status = 200, description = "Page of users", body = PaginatedResponse<UserWithChecklistCount>),
        (status = 403, description = "Admin role required"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<UserWithChecklistCount>>> {
    require_admin(&current_user, Operation::ReadAll, Resource::Users)?;
    let (skip, limit) = pagination.params();

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);
    let total = repo.count().await?;
    let users = repo.list_with_checklist_counts(&UserFilter::new(skip, limit)).await?;

    let data = users
        .into_iter()
        .map(|row| UserWithChecklistCount {
            user: UserResponse::from(row.user),
            checklist_count: row.checklist_count,
        })
        .collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    get,
    path = "/admin/checklists",
    tag = "admin",
    summary = "List every user's checklists",
    params(ListChecklistsQuery),
    responses(
        (status = 200, description = "Page of checklists", body = PaginatedResponse<ChecklistResponse>),
        (status = 403, description = "Admin role required"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_all_checklists(
    State(state): State<AppState>,
    Query(query): Query<ListChecklistsQuery>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<ChecklistResponse>>> {
    require_admin(&current_user, Operation::ReadAll, Resource::Checklists)?;
    let (skip, limit) = query.pagination.params();
    let filter = ChecklistFilter {
        skip,
        limit,
        workspace_id: query.workspace_id,
        deal_id: query.deal_id,
        user_id: query.user_id,
        search: query.search,
        visible_to: None,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Checklists::new(&mut conn);
    let total = repo.count(&filter).await?;
    let checklists = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        checklists.into_iter().map(ChecklistResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}
