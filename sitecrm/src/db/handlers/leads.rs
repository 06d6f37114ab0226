//! Database repository for leads.

use crate::api::models::{leads::LeadFieldsPatch, pipeline::LeadStatus};
use crate::db::{
    errors::{DbError, Result},
    handlers::{
        filters::{ScopeFilter, push_eq, push_page, push_scope, push_set, push_update_target},
        repository::Repository,
    },
    models::leads::{LeadCreateDBRequest, LeadDBResponse, LeadUpdateDBRequest},
};
use crate::types::LeadId;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["name", "company_name", "contact_name", "email"];

/// Filter for listing leads
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub skip: i64,
    pub limit: i64,
    pub scope: ScopeFilter,
    pub status: Option<LeadStatus>,
    pub priority: Option<String>,
    pub source: Option<String>,
}

impl LeadFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Postgres>, filter: &'a LeadFilter) {
    push_scope(query, &filter.scope, SEARCH_COLUMNS);
    push_eq(query, "status", filter.status);
    push_eq(query, "priority", filter.priority.as_deref());
    push_eq(query, "source", filter.source.as_deref());
}

fn push_field_updates<'a>(query: &mut QueryBuilder<'a, Postgres>, f: &'a LeadFieldsPatch) {
    push_set(query, "priority", f.priority.as_ref().map(Option::as_deref));
    push_set(query, "source", f.source.as_ref().map(Option::as_deref));
    push_set(query, "contact_name", f.contact_name.as_ref().map(Option::as_deref));
    push_set(query, "company_name", f.company_name.as_ref().map(Option::as_deref));
    push_set(query, "job_title", f.job_title.as_ref().map(Option::as_deref));
    push_set(query, "email", f.email.as_ref().map(Option::as_deref));
    push_set(query, "phone", f.phone.as_ref().map(Option::as_deref));
    push_set(query, "next_interaction_date", f.next_interaction_date);
    push_set(query, "qualified_date", f.qualified_date);
    push_set(query, "notes", f.notes.as_ref().map(Option::as_deref));
}

pub struct Leads<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Leads<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &LeadFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM leads WHERE 1=1");
        push_filters(&mut query, filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Leads<'c> {
    type CreateRequest = LeadCreateDBRequest;
    type UpdateRequest = LeadUpdateDBRequest;
    type Response = LeadDBResponse;
    type Id = LeadId;
    type Filter = LeadFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let f = &request.fields;
        let lead = sqlx::query_as::<_, LeadDBResponse>(
            r#"
            INSERT INTO leads (
                name, status, priority, source, contact_name, company_name, job_title, email, phone,
                next_interaction_date, qualified_date, notes,
                workspace_id, owner_id, owner_name, monday_item_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(request.status)
        .bind(&f.priority)
        .bind(&f.source)
        .bind(&f.contact_name)
        .bind(&f.company_name)
        .bind(&f.job_title)
        .bind(&f.email)
        .bind(&f.phone)
        .bind(f.next_interaction_date)
        .bind(f.qualified_date)
        .bind(&f.notes)
        .bind(request.workspace_id)
        .bind(request.owner_id)
        .bind(&request.owner_name)
        .bind(&request.monday_item_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(lead)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let lead = sqlx::query_as::<_, LeadDBResponse>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(lead)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM leads WHERE 1=1");
        push_filters(&mut query, filter);
        push_page(&mut query, filter.skip, filter.limit);

        let leads = query.build_query_as::<LeadDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(leads)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut query = QueryBuilder::new("UPDATE leads SET updated_at = NOW()");
        push_set(&mut query, "name", request.name.as_deref());
        push_set(&mut query, "status", request.status);
        push_field_updates(&mut query, &request.fields);
        push_set(&mut query, "workspace_id", request.workspace_id);
        push_set(&mut query, "owner_id", request.owner_id);
        push_set(&mut query, "owner_name", request.owner_name.as_ref().map(Option::as_deref));
        push_set(&mut query, "monday_item_id", request.monday_item_id.as_ref().map(Option::as_deref));
        push_update_target(&mut query, id);

        let lead = query
            .build_query_as::<LeadDBResponse>()
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(lead)
    }
}
