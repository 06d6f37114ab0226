use crate::api::handlers::{ensure_name, not_found};
use crate::api::models::deals::{DealCreate, DealResponse, DealUpdate, ListDealsQuery};
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::pipeline::ensure_transition;
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{ensure_can_assign, ensure_visible, resolve_new_owner, visibility_scope};
use crate::db::handlers::{Deals, Repository, deals::DealFilter, filters::ScopeFilter};
use crate::db::models::deals::{DealCreateDBRequest, DealUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{DealId, Operation, Resource};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/deals",
    tag = "deals",
    summary = "List deals",
    description = "Newest first. Non-admins only see their own and unowned deals.",
    params(ListDealsQuery),
    responses(
        (status = 200, description = "Page of deals", body = PaginatedResponse<DealResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_deals(
    State(state): State<AppState>,
    Query(query): Query<ListDealsQuery>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<DealResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = DealFilter {
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
        deal_type: query.deal_type,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Deals::new(&mut conn);
    let total = repo.count(&filter).await?;
    let deals = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        deals.into_iter().map(DealResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/deals/{id}",
    tag = "deals",
    summary = "Get deal",
    params(("id" = i64, Path, description = "Deal ID")),
    responses(
        (status = 200, description = "Deal", body = DealResponse),
        (status = 404, description = "Deal not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(deal_id = id))]
pub async fn get_deal(State(state): State<AppState>, Path(id): Path<DealId>, current_user: CurrentUser) -> Result<Json<DealResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deal = Deals::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found("Deal", id))?;
    ensure_visible(&current_user, deal.owner_id, "Deal", id)?;
    Ok(Json(DealResponse::from(deal)))
}

#[utoipa::path(
    post,
    path = "/deals",
    tag = "deals",
    summary = "Create deal",
    request_body = DealCreate,
    responses(
        (status = 201, description = "Deal created", body = DealResponse),
        (status = 400, description = "Invalid request or duplicate monday_item_id"),
        (status = 403, description = "Cannot assign the deal to another user"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_deal(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<DealCreate>,
) -> Result<(StatusCode, Json<DealResponse>)> {
    ensure_name(&create.name)?;
    create.fields.validate()?;
    let (owner_id, owner_name) = resolve_new_owner(&current_user, create.owner_id, create.owner_name.clone(), Resource::Deals)?;

    let request = DealCreateDBRequest {
        owner_id: Some(owner_id),
        owner_name,
        ..DealCreateDBRequest::from(create)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deal = Deals::new(&mut conn).create(&request).await?;
    Ok((StatusCode::CREATED, Json(DealResponse::from(deal))))
}

#[utoipa::path(
    put,
    path = "/deals/{id}",
    tag = "deals",
    summary = "Update deal",
    description = "Only the supplied fields change. Stage moves must follow the deal pipeline.",
    request_body = DealUpdate,
    params(("id" = i64, Path, description = "Deal ID")),
    responses(
        (status = 200, description = "Deal updated", body = DealResponse),
        (status = 400, description = "Invalid field value or stage transition"),
        (status = 403, description = "Cannot assign the deal to another user"),
        (status = 404, description = "Deal not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(deal_id = id))]
pub async fn update_deal(
    State(state): State<AppState>,
    Path(id): Path<DealId>,
    current_user: CurrentUser,
    Json(update): Json<DealUpdate>,
) -> Result<Json<DealResponse>> {
    if let Some(name) = &update.name {
        ensure_name(name)?;
    }
    update.fields.validate()?;
    ensure_can_assign(&current_user, update.owner_id, Operation::UpdateOwn, Resource::Deals)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Deals::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Deal", id))?;
    ensure_visible(&current_user, existing.owner_id, "Deal", id)?;
    if let Some(stage) = update.stage {
        ensure_transition(existing.stage, stage)?;
    }

    let deal = repo.update(id, &DealUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(DealResponse::from(deal)))
}

#[utoipa::path(
    delete,
    path = "/deals/{id}",
    tag = "deals",
    summary = "Delete deal",
    params(("id" = i64, Path, description = "Deal ID")),
    responses(
        (status = 204, description = "Deal deleted"),
        (status = 404, description = "Deal not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(deal_id = id))]
pub async fn delete_deal(State(state): State<AppState>, Path(id): Path<DealId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Deals::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Deal", id))?;
    ensure_visible(&current_user, existing.owner_id, "Deal", id)?;
    repo.delete(id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::deals::DealResponse;
    use crate::api::models::pagination::PaginatedResponse;
    use crate::api::models::pipeline::DealStage;
    use crate::api::models::users::Role;
    use crate::test_utils::{add_auth_headers, create_test_app, create_test_user};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_defaults_owner_to_caller(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let response = app
            .post("/deals")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"name": "Office fit-out", "value": "1500.00"}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let deal: DealResponse = response.json();
        assert_eq!(deal.stage, DealStage::Prospects);
        assert_eq!(deal.fields.status.as_deref(), Some("New deal"));
        assert_eq!(deal.owner_id, Some(user.id));
        assert_eq!(deal.owner_name, user.full_name);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_non_admin_visibility(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let alice = create_test_user(&pool, Role::User).await;
        let bob = create_test_user(&pool, Role::User).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        let response = app
            .post("/deals")
            .add_header(add_auth_headers(&alice).0, add_auth_headers(&alice).1)
            .json(&json!({"name": "Alice's deal"}))
            .await;
        let alices: DealResponse = response.json();
        sqlx::query("INSERT INTO deals (name) VALUES ('Unowned')").execute(&pool).await.unwrap();

        let page: PaginatedResponse<DealResponse> = app
            .get("/deals")
            .add_header(add_auth_headers(&bob).0, add_auth_headers(&bob).1)
            .await
            .json();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].name, "Unowned");

        app.get(&format!("/deals/{}", alices.id))
            .add_header(add_auth_headers(&bob).0, add_auth_headers(&bob).1)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        app.delete(&format!("/deals/{}", alices.id))
            .add_header(add_auth_headers(&bob).0, add_auth_headers(&bob).1)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let page: PaginatedResponse<DealResponse> = app
            .get("/deals")
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .await
            .json();
        assert_eq!(page.total, 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cannot_assign_to_someone_else(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let alice = create_test_user(&pool, Role::User).await;
        let bob = create_test_user(&pool, Role::User).await;

        app.post("/deals")
            .add_header(add_auth_headers(&alice).0, add_auth_headers(&alice).1)
            .json(&json!({"name": "Gift", "owner_id": bob.id}))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let deal: DealResponse = app
            .post("/deals")
            .add_header(add_auth_headers(&alice).0, add_auth_headers(&alice).1)
            .json(&json!({"name": "Mine"}))
            .await
            .json();
        app.put(&format!("/deals/{}", deal.id))
            .add_header(add_auth_headers(&alice).0, add_auth_headers(&alice).1)
            .json(&json!({"owner_id": bob.id}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_validates_stage_and_probability(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;
        let deal: DealResponse = app
            .post("/deals")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"name": "Pipeline"}))
            .await
            .json();

        let response = app
            .put(&format!("/deals/{}", deal.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"stage": "Completed"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        app.put(&format!("/deals/{}", deal.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"close_probability": 150}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.post("/deals")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"name": "  "}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let updated: DealResponse = app
            .put(&format!("/deals/{}", deal.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"stage": "Proposal sent", "close_probability": 60}))
            .await
            .json();
        assert_eq!(updated.stage, DealStage::ProposalSent);
        assert_eq!(updated.fields.close_probability, Some(60));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_explicit_null_clears_field(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;
        let deal: DealResponse = app
            .post("/deals")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"name": "Refit", "notes": "old note", "close_date": "2024-01-01", "grade": "A"}))
            .await
            .json();

        let updated: DealResponse = app
            .put(&format!("/deals/{}", deal.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"notes": null, "close_date": null}))
            .await
            .json();

        assert_eq!(updated.fields.notes, None);
        assert_eq!(updated.fields.close_date, None);
        // Keys that were not sent keep their values
        assert_eq!(updated.fields.grade.as_deref(), Some("A"));
        assert_eq!(updated.name, "Refit");
        assert_eq!(updated.owner_id, Some(user.id));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unrecognised_stored_stage_does_not_break_listing(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        app.post("/deals")
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .json(&json!({"name": "Valid"}))
            .await
            .assert_status(StatusCode::CREATED);
        sqlx::query("INSERT INTO deals (name, stage) VALUES ('Imported', 'Contract sent')")
            .execute(&pool)
            .await
            .unwrap();

        let response = app
            .get("/deals")
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .await;
        response.assert_status_ok();
        let page: PaginatedResponse<DealResponse> = response.json();
        assert_eq!(page.total, 2);
        let imported = page.data.iter().find(|d| d.name == "Imported").unwrap();
        assert_eq!(imported.stage, DealStage::Prospects);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_and_pagination(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        for (name, grade) in [("One", "A"), ("Two", "B"), ("Three", "A")] {
            app.post("/deals")
                .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
                .json(&json!({"name": name, "grade": grade, "company_name": "Acme Ltd"}))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let page: PaginatedResponse<DealResponse> = app
            .get("/deals?grade=A&limit=1")
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .await
            .json();
        assert_eq!(page.total, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.limit, 1);
        assert_eq!(page.data[0].name, "Three");

        let page: PaginatedResponse<DealResponse> = app
            .get("/deals?search=acme&skip=2")
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .await
            .json();
        assert_eq!(page.total, 3);
        assert_eq!(page.skip, 2);
        assert_eq!(page.data[0].name, "One");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_search_matches_wildcards_literally(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        for name in ["Alpha", "50% rebate", "Dock_4"] {
            app.post("/deals")
                .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
                .json(&json!({"name": name}))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let search = |term: &str| {
            app.get("/deals")
                .add_query_param("search", term)
                .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
        };

        let page: PaginatedResponse<DealResponse> = search("_").await.json();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].name, "Dock_4");

        let page: PaginatedResponse<DealResponse> = search("%").await.json();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].name, "50% rebate");

        let page: PaginatedResponse<DealResponse> = search("\\").await.json();
        assert_eq!(page.total, 0);

        let page: PaginatedResponse<DealResponse> = search("ALP").await.json();
        assert_eq!(page.total, 1);
    }
}
