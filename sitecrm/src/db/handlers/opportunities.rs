//! Database repository for opportunities.

use crate::api::models::{opportunities::OpportunityFieldsPatch, pipeline::OpportunityStage};
use crate::db::{
    errors::{DbError, Result},
    handlers::{
        filters::{ScopeFilter, push_eq, push_page, push_scope, push_set, push_update_target},
        repository::Repository,
    },
    models::opportunities::{OpportunityCreateDBRequest, OpportunityDBResponse, OpportunityUpdateDBRequest},
};
use crate::types::OpportunityId;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["name", "company_name", "contact_name"];

/// Filter for listing opportunities
#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter {
    pub skip: i64,
    pub limit: i64,
    pub scope: ScopeFilter,
    pub stage: Option<OpportunityStage>,
    pub grade: Option<String>,
}

impl OpportunityFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Postgres>, filter: &'a OpportunityFilter) {
    push_scope(query, &filter.scope, SEARCH_COLUMNS);
    push_eq(query, "stage", filter.stage);
    push_eq(query, "grade", filter.grade.as_deref());
}

fn push_field_updates<'a>(query: &mut QueryBuilder<'a, Postgres>, f: &'a OpportunityFieldsPatch) {
    push_set(query, "grade", f.grade.as_ref().map(Option::as_deref));
    push_set(query, "contact_name", f.contact_name.as_ref().map(Option::as_deref));
    push_set(query, "company_name", f.company_name.as_ref().map(Option::as_deref));
    push_set(query, "email", f.email.as_ref().map(Option::as_deref));
    push_set(query, "phone", f.phone.as_ref().map(Option::as_deref));
    push_set(query, "sale_price", f.sale_price);
    push_set(query, "close_probability", f.close_probability);
    push_set(query, "survey_required", f.survey_required);
    push_set(query, "quote_template", f.quote_template.as_ref().map(Option::as_deref));
    push_set(query, "next_interaction", f.next_interaction);
    push_set(query, "return_date", f.return_date);
    push_set(query, "quote_sent_date", f.quote_sent_date);
    push_set(query, "decision_date", f.decision_date);
    push_set(query, "close_date", f.close_date);
    push_set(query, "location_address", f.location_address.as_ref().map(Option::as_deref));
    push_set(query, "link", f.link.as_ref().map(Option::as_deref));
}

pub struct Opportunities<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Opportunities<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &OpportunityFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM opportunities WHERE 1=1");
        push_filters(&mut query, filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Opportunities<'c> {
    type CreateRequest = OpportunityCreateDBRequest;
    type UpdateRequest = OpportunityUpdateDBRequest;
    type Response = OpportunityDBResponse;
    type Id = OpportunityId;
    type Filter = OpportunityFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let f = &request.fields;
        let opportunity = sqlx::query_as::<_, OpportunityDBResponse>(
            r#"
            INSERT INTO opportunities (
                name, stage, grade, contact_name, company_name, email, phone,
                sale_price, close_probability, survey_required, quote_template,
                next_interaction, return_date, quote_sent_date, decision_date, close_date,
                location_address, link,
                workspace_id, owner_id, owner_name, monday_item_id
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7,
                $8, $9, COALESCE($10, FALSE), $11,
                $12, $13, $14, $15, $16,
                $17, $18,
                $19, $20, $21, $22
            )
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(request.stage)
        .bind(&f.grade)
        .bind(&f.contact_name)
        .bind(&f.company_name)
        .bind(&f.email)
        .bind(&f.phone)
        .bind(f.sale_price)
        .bind(f.close_probability)
        .bind(f.survey_required)
        .bind(&f.quote_template)
        .bind(f.next_interaction)
        .bind(f.return_date)
        .bind(f.quote_sent_date)
        .bind(f.decision_date)
        .bind(f.close_date)
        .bind(&f.location_address)
        .bind(&f.link)
        .bind(request.workspace_id)
        .bind(request.owner_id)
        .bind(&request.owner_name)
        .bind(&request.monday_item_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(opportunity)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let opportunity = sqlx::query_as::<_, OpportunityDBResponse>("SELECT * FROM opportunities WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(opportunity)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM opportunities WHERE 1=1");
        push_filters(&mut query, filter);
        push_page(&mut query, filter.skip, filter.limit);

        let opportunities = query.build_query_as::<OpportunityDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(opportunities)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM opportunities WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut query = QueryBuilder::new("UPDATE opportunities SET updated_at = NOW()");
        push_set(&mut query, "name", request.name.as_deref());
        push_set(&mut query, "stage", request.stage);
        push_field_updates(&mut query, &request.fields);
        push_set(&mut query, "workspace_id", request.workspace_id);
        push_set(&mut query, "owner_id", request.owner_id);
        push_set(&mut query, "owner_name", request.owner_name.as_ref().map(Option::as_deref));
        push_set(&mut query, "monday_item_id", request.monday_item_id.as_ref().map(Option::as_deref));
        push_update_target(&mut query, id);

        let opportunity = query
            .build_query_as::<OpportunityDBResponse>()
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(opportunity)
    }
}
