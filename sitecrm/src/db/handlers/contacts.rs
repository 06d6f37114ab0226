//! Database repository for contacts.

use crate::api::models::contacts::ContactFieldsPatch;
use crate::db::{
    errors::{DbError, Result},
    handlers::{
        filters::{ScopeFilter, push_eq, push_page, push_scope, push_set, push_update_target},
        repository::Repository,
    },
    models::contacts::{ContactCreateDBRequest, ContactDBResponse, ContactUpdateDBRequest},
};
use crate::types::{AccountId, ContactId};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["name", "company", "email"];

/// Filter for listing contacts
#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub skip: i64,
    pub limit: i64,
    pub scope: ScopeFilter,
    pub account_id: Option<AccountId>,
    pub contact_type: Option<String>,
    pub icp_fit: Option<String>,
    pub tier: Option<String>,
    pub outreach_stage: Option<String>,
}

impl ContactFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Postgres>, filter: &'a ContactFilter) {
    push_scope(query, &filter.scope, SEARCH_COLUMNS);
    push_eq(query, "account_id", filter.account_id);
    push_eq(query, "contact_type", filter.contact_type.as_deref());
    push_eq(query, "icp_fit", filter.icp_fit.as_deref());
    push_eq(query, "tier", filter.tier.as_deref());
    push_eq(query, "outreach_stage", filter.outreach_stage.as_deref());
}

fn push_field_updates<'a>(query: &mut QueryBuilder<'a, Postgres>, f: &'a ContactFieldsPatch) {
    push_set(query, "company", f.company.as_ref().map(Option::as_deref));
    push_set(query, "account_id", f.account_id);
    push_set(query, "contact_type", f.contact_type.as_ref().map(Option::as_deref));
    push_set(query, "job_title", f.job_title.as_ref().map(Option::as_deref));
    push_set(query, "tier", f.tier.as_ref().map(Option::as_deref));
    push_set(query, "email", f.email.as_ref().map(Option::as_deref));
    push_set(query, "phone", f.phone.as_ref().map(Option::as_deref));
    push_set(query, "linkedin_url", f.linkedin_url.as_ref().map(Option::as_deref));
    push_set(query, "location", f.location.as_ref().map(Option::as_deref));
    push_set(query, "source", f.source.as_ref().map(Option::as_deref));
    push_set(query, "icp_fit", f.icp_fit.as_ref().map(Option::as_deref));
    push_set(query, "outreach_stage", f.outreach_stage.as_ref().map(Option::as_deref));
    push_set(query, "about", f.about.as_ref().map(Option::as_deref));
}

pub struct Contacts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Contacts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ContactFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM contacts WHERE 1=1");
        push_filters(&mut query, filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Contacts<'c> {
    type CreateRequest = ContactCreateDBRequest;
    type UpdateRequest = ContactUpdateDBRequest;
    type Response = ContactDBResponse;
    type Id = ContactId;
    type Filter = ContactFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let f = &request.fields;
        let contact = sqlx::query_as::<_, ContactDBResponse>(
            r#"
            INSERT INTO contacts (
                name, company, account_id, contact_type, job_title, tier, email, phone,
                linkedin_url, location, source, icp_fit, outreach_stage, about,
                workspace_id, owner_id, owner_name, monday_item_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&f.company)
        .bind(f.account_id)
        .bind(&f.contact_type)
        .bind(&f.job_title)
        .bind(&f.tier)
        .bind(&f.email)
        .bind(&f.phone)
        .bind(&f.linkedin_url)
        .bind(&f.location)
        .bind(&f.source)
        .bind(&f.icp_fit)
        .bind(&f.outreach_stage)
        .bind(&f.about)
        .bind(request.workspace_id)
        .bind(request.owner_id)
        .bind(&request.owner_name)
        .bind(&request.monday_item_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(contact)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let contact = sqlx::query_as::<_, ContactDBResponse>("SELECT * FROM contacts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(contact)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM contacts WHERE 1=1");
        push_filters(&mut query, filter);
        push_page(&mut query, filter.skip, filter.limit);

        let contacts = query.build_query_as::<ContactDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(contacts)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut query = QueryBuilder::new("UPDATE contacts SET updated_at = NOW()");
        push_set(&mut query, "name", request.name.as_deref());
        push_field_updates(&mut query, &request.fields);
        push_set(&mut query, "workspace_id", request.workspace_id);
        push_set(&mut query, "owner_id", request.owner_id);
        push_set(&mut query, "owner_name", request.owner_name.as_ref().map(Option::as_deref));
        push_set(&mut query, "monday_item_id", request.monday_item_id.as_ref().map(Option::as_deref));
        push_update_target(&mut query, id);

        let contact = query
            .build_query_as::<ContactDBResponse>()
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(contact)
    }
}
