use crate::api::handlers::{ensure_name, not_found};
use crate::api::models::contacts::{ContactCreate, ContactResponse, ContactUpdate, ListContactsQuery};
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{ensure_can_assign, ensure_visible, resolve_new_owner, visibility_scope};
use crate::db::handlers::{Contacts, Repository, contacts::ContactFilter, filters::ScopeFilter};
use crate::db::models::contacts::{ContactCreateDBRequest, ContactUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{ContactId, Operation, Resource};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/contacts",
    tag = "contacts",
    summary = "List contacts",
    params(ListContactsQuery),
    responses(
        (status = 200, description = "Page of contacts", body = PaginatedResponse<ContactResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ListContactsQuery>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<ContactResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = ContactFilter {
        skip,
        limit,
        scope: ScopeFilter {
            workspace_id: query.workspace_id,
            owner_name: query.owner_name,
            search: query.search,
            visible_to: visibility_scope(&current_user),
        },
        account_id: query.account_id,
        contact_type: query.contact_type,
        icp_fit: query.icp_fit,
        tier: query.tier,
        outreach_stage: query.outreach_stage,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Contacts::new(&mut conn);
    let total = repo.count(&filter).await?;
    let rows = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(ContactResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/contacts/{id}",
    tag = "contacts",
    summary = "Get contact",
    params(("id" = i64, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Contact", body = ContactResponse),
        (status = 404, description = "Contact not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(contact_id = id))]
pub async fn get_contact(State(state): State<AppState>, Path(id): Path<ContactId>, current_user: CurrentUser) -> Result<Json<ContactResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let contact = Contacts::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found("Contact", id))?;
    ensure_visible(&current_user, contact.owner_id, "Contact", id)?;
    Ok(Json(ContactResponse::from(contact)))
}

#[utoipa::path(
    post,
    path = "/contacts",
    tag = "contacts",
    summary = "Create contact",
    request_body = ContactCreate,
    responses(
        (status = 201, description = "Contact created", body = ContactResponse),
        (status = 400, description = "Invalid request or duplicate monday_item_id"),
        (status = 403, description = "Cannot assign the contact to another user"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_contact(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<ContactCreate>,
) -> Result<(StatusCode, Json<ContactResponse>)> {
    ensure_name(&create.name)?;
    let (owner_id, owner_name) = resolve_new_owner(&current_user, create.owner_id, create.owner_name.clone(), Resource::Contacts)?;

    let request = ContactCreateDBRequest {
        owner_id: Some(owner_id),
        owner_name,
        ..ContactCreateDBRequest::from(create)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let contact = Contacts::new(&mut conn).create(&request).await?;
    Ok((StatusCode::CREATED, Json(ContactResponse::from(contact))))
}

#[utoipa::path(
    put,
    path = "/contacts/{id}",
    tag = "contacts",
    summary = "Update contact",
    description = "Only the supplied fields change.",
    request_body = ContactUpdate,
    params(("id" = i64, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Contact updated", body = ContactResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Cannot assign the contact to another user"),
        (status = 404, description = "Contact not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(contact_id = id))]
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    current_user: CurrentUser,
    Json(update): Json<ContactUpdate>,
) -> Result<Json<ContactResponse>> {
    if let Some(name) = &update.name {
        ensure_name(name)?;
    }
    ensure_can_assign(&current_user, update.owner_id, Operation::UpdateOwn, Resource::Contacts)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Contacts::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Contact", id))?;
    ensure_visible(&current_user, existing.owner_id, "Contact", id)?;

    let contact = repo.update(id, &ContactUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ContactResponse::from(contact)))
}

#[utoipa::path(
    delete,
    path = "/contacts/{id}",
    tag = "contacts",
    summary = "Delete contact",
    params(("id" = i64, Path, description = "Contact ID")),
    responses(
        (status = 204, description = "Contact deleted"),
        (status = 404, description = "Contact not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(contact_id = id))]
pub async fn delete_contact(State(state): State<AppState>, Path(id): Path<ContactId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Contacts::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Contact", id))?;
    ensure_visible(&current_user, existing.owner_id, "Contact", id)?;
    repo.delete(id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}
