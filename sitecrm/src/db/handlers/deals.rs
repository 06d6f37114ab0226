//! Database repository for deals.

use crate::api::models::{deals::DealFieldsPatch, pipeline::DealStage};
use crate::db::{
    errors::{DbError, Result},
    handlers::{
        filters::{ScopeFilter, push_eq, push_page, push_scope, push_set, push_update_target},
        repository::Repository,
    },
    models::deals::{DealCreateDBRequest, DealDBResponse, DealUpdateDBRequest},
};
use crate::types::DealId;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["name", "company_name", "contact_name", "email"];

/// Filter for listing deals
#[derive(Debug, Clone, Default)]
pub struct DealFilter {
    pub skip: i64,
    pub limit: i64,
    pub scope: ScopeFilter,
    pub stage: Option<DealStage>,
    pub grade: Option<String>,
    pub deal_type: Option<String>,
}

impl DealFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Postgres>, filter: &'a DealFilter) {
    push_scope(query, &filter.scope, SEARCH_COLUMNS);
    push_eq(query, "stage", filter.stage);
    push_eq(query, "grade", filter.grade.as_deref());
    push_eq(query, "deal_type", filter.deal_type.as_deref());
}

fn push_field_updates<'a>(query: &mut QueryBuilder<'a, Postgres>, f: &'a DealFieldsPatch) {
    push_set(query, "status", f.status.as_ref().map(Option::as_deref));
    push_set(query, "grade", f.grade.as_ref().map(Option::as_deref));
    push_set(query, "value", f.value);
    push_set(query, "deal_type", f.deal_type.as_ref().map(Option::as_deref));
    push_set(query, "deal_length", f.deal_length);
    push_set(query, "products", f.products.as_ref().map(Option::as_deref));
    push_set(query, "company_name", f.company_name.as_ref().map(Option::as_deref));
    push_set(query, "contact_name", f.contact_name.as_ref().map(Option::as_deref));
    push_set(query, "email", f.email.as_ref().map(Option::as_deref));
    push_set(query, "phone", f.phone.as_ref().map(Option::as_deref));
    push_set(query, "next_interaction", f.next_interaction);
    push_set(query, "proposal_sent_date", f.proposal_sent_date);
    push_set(query, "close_date", f.close_date);
    push_set(query, "close_probability", f.close_probability);
    push_set(query, "location_address", f.location_address.as_ref().map(Option::as_deref));
    push_set(query, "link_url", f.link_url.as_ref().map(Option::as_deref));
    push_set(query, "files", f.files.as_ref().map(Option::as_deref));
    push_set(query, "notes", f.notes.as_ref().map(Option::as_deref));
}

pub struct Deals<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Deals<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &DealFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM deals WHERE 1=1");
        push_filters(&mut query, filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Deals<'c> {
    type CreateRequest = DealCreateDBRequest;
    type UpdateRequest = DealUpdateDBRequest;
    type Response = DealDBResponse;
    type Id = DealId;
    type Filter = DealFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let f = &request.fields;
        let deal = sqlx::query_as::<_, DealDBResponse>(
            r#"
            INSERT INTO deals (
                name, stage, status, grade, value, deal_type, deal_length, products,
                company_name, contact_name, email, phone,
                next_interaction, proposal_sent_date, close_date, close_probability,
                location_address, link_url, files, notes,
                workspace_id, owner_id, owner_name, monday_item_id
            )
            VALUES (
                $1, $2, COALESCE($3, 'New deal'), $4, $5, $6, $7, COALESCE($8, '{}'),
                $9, $10, $11, $12,
                $13, $14, $15, $16,
                $17, $18, COALESCE($19, '{}'), $20,
                $21, $22, $23, $24
            )
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(request.stage)
        .bind(&f.status)
        .bind(&f.grade)
        .bind(f.value)
        .bind(&f.deal_type)
        .bind(f.deal_length)
        .bind(&f.products)
        .bind(&f.company_name)
        .bind(&f.contact_name)
        .bind(&f.email)
        .bind(&f.phone)
        .bind(f.next_interaction)
        .bind(f.proposal_sent_date)
        .bind(f.close_date)
        .bind(f.close_probability)
        .bind(&f.location_address)
        .bind(&f.link_url)
        .bind(&f.files)
        .bind(&f.notes)
        .bind(request.workspace_id)
        .bind(request.owner_id)
        .bind(&request.owner_name)
        .bind(&request.monday_item_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(deal)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let deal = sqlx::query_as::<_, DealDBResponse>("SELECT * FROM deals WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(deal)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM deals WHERE 1=1");
        push_filters(&mut query, filter);
        push_page(&mut query, filter.skip, filter.limit);

        let deals = query.build_query_as::<DealDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(deals)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM deals WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut query = QueryBuilder::new("UPDATE deals SET updated_at = NOW()");
        push_set(&mut query, "name", request.name.as_deref());
        push_set(&mut query, "stage", request.stage);
        push_field_updates(&mut query, &request.fields);
        push_set(&mut query, "workspace_id", request.workspace_id);
        push_set(&mut query, "owner_id", request.owner_id);
        push_set(&mut query, "owner_name", request.owner_name.as_ref().map(Option::as_deref));
        push_set(&mut query, "monday_item_id", request.monday_item_id.as_ref().map(Option::as_deref));
        push_update_target(&mut query, id);

        let deal = query
            .build_query_as::<DealDBResponse>()
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(deal)
    }
}
