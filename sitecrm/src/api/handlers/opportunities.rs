use crate::api::handlers::{ensure_name, not_found};
use crate::api::models::opportunities::{OpportunityCreate, OpportunityResponse, OpportunityUpdate, ListOpportunitiesQuery};
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::pipeline::ensure_transition;
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{ensure_can_assign, ensure_visible, resolve_new_owner, visibility_scope};
use crate::db::handlers::{Opportunities, Repository, opportunities::OpportunityFilter, filters::ScopeFilter};
use crate::db::models::opportunities::{OpportunityCreateDBRequest, OpportunityUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{OpportunityId, Operation, Resource};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/opportunities",
    tag = "opportunities",
    summary = "List opportunities",
    params(ListOpportunitiesQuery),
    responses(
        (status = 200, description = "Page of opportunities", body = PaginatedResponse<OpportunityResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_opportunities(
    State(state): State<AppState>,
    Query(query): Query<ListOpportunitiesQuery>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<OpportunityResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = OpportunityFilter {
        skip,
        limit,
        scope: ScopeFilter {
            workspace_id: query.workspace_id,
            owner_name: query.owner_name,
            search: query.search,
            visible_to: visibility_scope(&current_user),
        },
        stage: query.stage,
        grade: query.grade,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Opportunities::new(&mut conn);
    let total = repo.count(&filter).await?;
    let rows = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(OpportunityResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/opportunities/{id}",
    tag = "opportunities",
    summary = "Get opportunity",
    params(("id" = i64, Path, description = "Opportunity ID")),
    responses(
        (status = 200, description = "Opportunity", body = OpportunityResponse),
        (status = 404, description = "Opportunity not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(opportunity_id = id))]
pub async fn get_opportunity(State(state): State<AppState>, Path(id): Path<OpportunityId>, current_user: CurrentUser) -> Result<Json<OpportunityResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let opportunity = Opportunities::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found("Opportunity", id))?;
    ensure_visible(&current_user, opportunity.owner_id, "Opportunity", id)?;
    Ok(Json(OpportunityResponse::from(opportunity)))
}

#[utoipa::path(
    post,
    path = "/opportunities",
    tag = "opportunities",
    summary = "Create opportunity",
    request_body = OpportunityCreate,
    responses(
        (status = 201, description = "Opportunity created", body = OpportunityResponse),
        (status = 400, description = "Invalid request or duplicate monday_item_id"),
        (status = 403, description = "Cannot assign the opportunity to another user"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_opportunity(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<OpportunityCreate>,
) -> Result<(StatusCode, Json<OpportunityResponse>)> {
    ensure_name(&create.name)?;
    create.fields.validate()?;
    let (owner_id, owner_name) = resolve_new_owner(&current_user, create.owner_id, create.owner_name.clone(), Resource::Opportunities)?;

    let request = OpportunityCreateDBRequest {
        owner_id: Some(owner_id),
        owner_name,
        ..OpportunityCreateDBRequest::from(create)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let opportunity = Opportunities::new(&mut conn).create(&request).await?;
    Ok((StatusCode::CREATED, Json(OpportunityResponse::from(opportunity))))
}

#[utoipa::path(
    put,
    path = "/opportunities/{id}",
    tag = "opportunities",
    summary = "Update opportunity",
    description = "Only the supplied fields change. Stage changes must follow the opportunity pipeline.",
    request_body = OpportunityUpdate,
    params(("id" = i64, Path, description = "Opportunity ID")),
    responses(
        (status = 200, description = "Opportunity updated", body = OpportunityResponse),
        (status = 400, description = "Invalid field value or stage transition"),
        (status = 403, description = "Cannot assign the opportunity to another user"),
        (status = 404, description = "Opportunity not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(opportunity_id = id))]
pub async fn update_opportunity(
    State(state): State<AppState>,
    Path(id): Path<OpportunityId>,
    current_user: CurrentUser,
    Json(update): Json<OpportunityUpdate>,
) -> Result<Json<OpportunityResponse>> {
    if let Some(name) = &update.name {
        ensure_name(name)?;
    }
    update.fields.validate()?;
    ensure_can_assign(&current_user, update.owner_id, Operation::UpdateOwn, Resource::Opportunities)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Opportunities::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Opportunity", id))?;
    ensure_visible(&current_user, existing.owner_id, "Opportunity", id)?;
    if let Some(stage) = update.stage {
        ensure_transition(existing.stage, stage)?;
    }

    let opportunity = repo.update(id, &OpportunityUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(OpportunityResponse::from(opportunity)))
}

#[utoipa::path(
    delete,
    path = "/opportunities/{id}",
    tag = "opportunities",
    summary = "Delete opportunity",
    params(("id" = i64, Path, description = "Opportunity ID")),
    responses(
        (status = 204, description = "Opportunity deleted"),
        (status = 404, description = "Opportunity not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(opportunity_id = id))]
pub async fn delete_opportunity(State(state): State<AppState>, Path(id): Path<OpportunityId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Opportunities::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Opportunity", id))?;
    ensure_visible(&current_user, existing.owner_id, "Opportunity", id)?;
    repo.delete(id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}
