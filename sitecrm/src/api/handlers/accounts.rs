use crate::api::handlers::{ensure_name, not_found};
use crate::api::models::accounts::{AccountCreate, AccountResponse, AccountUpdate, ListAccountsQuery};
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::pipeline::ensure_transition;
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{ensure_can_assign, ensure_visible, resolve_new_owner, visibility_scope};
use crate::db::handlers::{Accounts, Repository, accounts::AccountFilter, filters::ScopeFilter};
use crate::db::models::accounts::{AccountCreateDBRequest, AccountUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{AccountId, Operation, Resource};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/accounts",
    tag = "accounts",
    summary = "List accounts",
    params(ListAccountsQuery),
    responses(
        (status = 200, description = "Page of accounts", body = PaginatedResponse<AccountResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<AccountResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = AccountFilter {
        skip,
        limit,
        scope: ScopeFilter {
            workspace_id: query.workspace_id,
            owner_name: query.owner_name,
            search: query.search,
            visible_to: visibility_scope(&current_user),
        },
        status: query.status,
        label: query.label,
        industry: query.industry,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Accounts::new(&mut conn);
    let total = repo.count(&filter).await?;
    let rows = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(AccountResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/accounts/{id}",
    tag = "accounts",
    summary = "Get account",
    params(("id" = i64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account", body = AccountResponse),
        (status = 404, description = "Account not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = id))]
pub async fn get_account(State(state): State<AppState>, Path(id): Path<AccountId>, current_user: CurrentUser) -> Result<Json<AccountResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = Accounts::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found("Account", id))?;
    ensure_visible(&current_user, account.owner_id, "Account", id)?;
    Ok(Json(AccountResponse::from(account)))
}

#[utoipa::path(
    post,
    path = "/accounts",
    tag = "accounts",
    summary = "Create account",
    request_body = AccountCreate,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Invalid request or duplicate monday_item_id"),
        (status = 403, description = "Cannot assign the account to another user"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_account(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<AccountCreate>,
) -> Result<(StatusCode, Json<AccountResponse>)> {
    ensure_name(&create.name)?;
    let (owner_id, owner_name) = resolve_new_owner(&current_user, create.owner_id, create.owner_name.clone(), Resource::Accounts)?;

    let request = AccountCreateDBRequest {
        owner_id: Some(owner_id),
        owner_name,
        ..AccountCreateDBRequest::from(create)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = Accounts::new(&mut conn).create(&request).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

#[utoipa::path(
    put,
    path = "/accounts/{id}",
    tag = "accounts",
    summary = "Update account",
    description = "Only the supplied fields change. Status changes must follow the account lifecycle.",
    request_body = AccountUpdate,
    params(("id" = i64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account updated", body = AccountResponse),
        (status = 400, description = "Invalid status transition"),
        (status = 403, description = "Cannot assign the account to another user"),
        (status = 404, description = "Account not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = id))]
pub async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    current_user: CurrentUser,
    Json(update): Json<AccountUpdate>,
) -> Result<Json<AccountResponse>> {
    if let Some(name) = &update.name {
        ensure_name(name)?;
    }
    ensure_can_assign(&current_user, update.owner_id, Operation::UpdateOwn, Resource::Accounts)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Accounts::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Account", id))?;
    ensure_visible(&current_user, existing.owner_id, "Account", id)?;
    if let Some(status) = update.status {
        ensure_transition(existing.status, status)?;
    }

    let account = repo.update(id, &AccountUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(AccountResponse::from(account)))
}

#[utoipa::path(
    delete,
    path = "/accounts/{id}",
    tag = "accounts",
    summary = "Delete account",
    params(("id" = i64, Path, description = "Account ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 404, description = "Account not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = id))]
pub async fn delete_account(State(state): State<AppState>, Path(id): Path<AccountId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Accounts::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Account", id))?;
    ensure_visible(&current_user, existing.owner_id, "Account", id)?;
    repo.delete(id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}
