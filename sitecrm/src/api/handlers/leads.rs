use crate::api::handlers::{ensure_name, not_found};
use crate::api::models::leads::{LeadCreate, LeadResponse, LeadUpdate, ListLeadsQuery};
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::pipeline::ensure_transition;
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{ensure_can_assign, ensure_visible, resolve_new_owner, visibility_scope};
use crate::db::handlers::{Leads, Repository, leads::LeadFilter, filters::ScopeFilter};
use crate::db::models::leads::{LeadCreateDBRequest, LeadUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{LeadId, Operation, Resource};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/leads",
    tag = "leads",
    summary = "List leads",
    description = "Newest first. Non-admins only see their own and unowned leads.",
    params(ListLeadsQuery),
    responses(
        (status = 200, description = "Page of leads", body = PaginatedResponse<LeadResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<ListLeadsQuery>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<LeadResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = LeadFilter {
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
        source: query.source,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Leads::new(&mut conn);
    let total = repo.count(&filter).await?;
    let rows = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(LeadResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/leads/{id}",
    tag = "leads",
    summary = "Get lead",
    params(("id" = i64, Path, description = "Lead ID")),
    responses(
        (status = 200, description = "Lead", body = LeadResponse),
        (status = 404, description = "Lead not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(lead_id = id))]
pub async fn get_lead(State(state): State<AppState>, Path(id): Path<LeadId>, current_user: CurrentUser) -> Result<Json<LeadResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let lead = Leads::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found("Lead", id))?;
    ensure_visible(&current_user, lead.owner_id, "Lead", id)?;
    Ok(Json(LeadResponse::from(lead)))
}

#[utoipa::path(
    post,
    path = "/leads",
    tag = "leads",
    summary = "Create lead",
    request_body = LeadCreate,
    responses(
        (status = 201, description = "Lead created", body = LeadResponse),
        (status = 400, description = "Invalid request or duplicate monday_item_id"),
        (status = 403, description = "Cannot assign the lead to another user"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_lead(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<LeadCreate>,
) -> Result<(StatusCode, Json<LeadResponse>)> {
    ensure_name(&create.name)?;
    let (owner_id, owner_name) = resolve_new_owner(&current_user, create.owner_id, create.owner_name.clone(), Resource::Leads)?;

    let request = LeadCreateDBRequest {
        owner_id: Some(owner_id),
        owner_name,
        ..LeadCreateDBRequest::from(create)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let lead = Leads::new(&mut conn).create(&request).await?;
    Ok((StatusCode::CREATED, Json(LeadResponse::from(lead))))
}

#[utoipa::path(
    put,
    path = "/leads/{id}",
    tag = "leads",
    summary = "Update lead",
    description = "Only the supplied fields change. Status changes must follow the lead pipeline.",
    request_body = LeadUpdate,
    params(("id" = i64, Path, description = "Lead ID")),
    responses(
        (status = 200, description = "Lead updated", body = LeadResponse),
        (status = 400, description = "Invalid status transition"),
        (status = 403, description = "Cannot assign the lead to another user"),
        (status = 404, description = "Lead not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(lead_id = id))]
pub async fn update_lead(
    State(state): State<AppState>,
    Path(id): Path<LeadId>,
    current_user: CurrentUser,
    Json(update): Json<LeadUpdate>,
) -> Result<Json<LeadResponse>> {
    if let Some(name) = &update.name {
        ensure_name(name)?;
    }
    ensure_can_assign(&current_user, update.owner_id, Operation::UpdateOwn, Resource::Leads)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Leads::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Lead", id))?;
    ensure_visible(&current_user, existing.owner_id, "Lead", id)?;
    if let Some(status) = update.status {
        ensure_transition(existing.status, status)?;
    }

    let lead = repo.update(id, &LeadUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(LeadResponse::from(lead)))
}

#[utoipa::path(
    delete,
    path = "/leads/{id}",
    tag = "leads",
    summary = "Delete lead",
    params(("id" = i64, Path, description = "Lead ID")),
    responses(
        (status = 204, description = "Lead deleted"),
        (status = 404, description = "Lead not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(lead_id = id))]
pub async fn delete_lead(State(state): State<AppState>, Path(id): Path<LeadId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Leads::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Lead", id))?;
    ensure_visible(&current_user, existing.owner_id, "Lead", id)?;
    repo.delete(id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}
