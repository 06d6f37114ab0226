//! Database repository for accounts.

use crate::api::models::{accounts::AccountFieldsPatch, pipeline::AccountStatus};
use crate::db::{
    errors::{DbError, Result},
    handlers::{
        filters::{ScopeFilter, push_eq, push_page, push_scope, push_set, push_update_target},
        repository::Repository,
    },
    models::accounts::{AccountCreateDBRequest, AccountDBResponse, AccountUpdateDBRequest},
};
use crate::types::AccountId;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["name", "industry", "website"];

/// Filter for listing accounts
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub skip: i64,
    pub limit: i64,
    pub scope: ScopeFilter,
    pub status: Option<AccountStatus>,
    pub label: Option<String>,
    pub industry: Option<String>,
}

impl AccountFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Postgres>, filter: &'a AccountFilter) {
    push_scope(query, &filter.scope, SEARCH_COLUMNS);
    push_eq(query, "status", filter.status);
    push_eq(query, "label", filter.label.as_deref());
    push_eq(query, "industry", filter.industry.as_deref());
}

fn push_field_updates<'a>(query: &mut QueryBuilder<'a, Postgres>, f: &'a AccountFieldsPatch) {
    push_set(query, "label", f.label.as_ref().map(Option::as_deref));
    push_set(query, "industry", f.industry.as_ref().map(Option::as_deref));
    push_set(query, "employee_count", f.employee_count.as_ref().map(Option::as_deref));
    push_set(query, "website", f.website.as_ref().map(Option::as_deref));
    push_set(query, "company_profile_url", f.company_profile_url.as_ref().map(Option::as_deref));
    push_set(query, "address", f.address.as_ref().map(Option::as_deref));
    push_set(query, "notes", f.notes.as_ref().map(Option::as_deref));
}

pub struct Accounts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Accounts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &AccountFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM accounts WHERE 1=1");
        push_filters(&mut query, filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Accounts<'c> {
    type CreateRequest = AccountCreateDBRequest;
    type UpdateRequest = AccountUpdateDBRequest;
    type Response = AccountDBResponse;
    type Id = AccountId;
    type Filter = AccountFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let f = &request.fields;
        let account = sqlx::query_as::<_, AccountDBResponse>(
            r#"
            INSERT INTO accounts (
                name, status, label, industry, employee_count, website, company_profile_url, address, notes,
                workspace_id, owner_id, owner_name, monday_item_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(request.status)
        .bind(&f.label)
        .bind(&f.industry)
        .bind(&f.employee_count)
        .bind(&f.website)
        .bind(&f.company_profile_url)
        .bind(&f.address)
        .bind(&f.notes)
        .bind(request.workspace_id)
        .bind(request.owner_id)
        .bind(&request.owner_name)
        .bind(&request.monday_item_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(account)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let account = sqlx::query_as::<_, AccountDBResponse>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(account)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM accounts WHERE 1=1");
        push_filters(&mut query, filter);
        push_page(&mut query, filter.skip, filter.limit);

        let accounts = query.build_query_as::<AccountDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(accounts)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut query = QueryBuilder::new("UPDATE accounts SET updated_at = NOW()");
        push_set(&mut query, "name", request.name.as_deref());
        push_set(&mut query, "status", request.status);
        push_field_updates(&mut query, &request.fields);
        push_set(&mut query, "workspace_id", request.workspace_id);
        push_set(&mut query, "owner_id", request.owner_id);
        push_set(&mut query, "owner_name", request.owner_name.as_ref().map(Option::as_deref));
        push_set(&mut query, "monday_item_id", request.monday_item_id.as_ref().map(Option::as_deref));
        push_update_target(&mut query, id);

        let account = query
            .build_query_as::<AccountDBResponse>()
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::accounts::AccountFields;
    use crate::test_utils::setup_schema;
    use sqlx::PgPool;

    fn new_account(name: &str, industry: &str) -> AccountCreateDBRequest {
        AccountCreateDBRequest {
            name: name.to_string(),
            status: AccountStatus::Prospect,
            fields: AccountFields {
                industry: Some(industry.to_string()),
                ..Default::default()
            },
            workspace_id: None,
            owner_id: None,
            owner_name: None,
            monday_item_id: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_industry_filter_and_workspace_scope(pool: PgPool) {
        setup_schema(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let westpark: i64 = sqlx::query_scalar("SELECT id FROM workspaces WHERE name = 'Westpark'")
            .fetch_one(&mut *conn)
            .await
            .unwrap();

        let mut repo = Accounts::new(&mut conn);
        repo.create(&new_account("Northwind", "Retail")).await.unwrap();
        let mut scoped = new_account("Contoso", "Construction");
        scoped.workspace_id = Some(westpark);
        repo.create(&scoped).await.unwrap();

        let mut filter = AccountFilter::new(0, 100);
        filter.industry = Some("Retail".to_string());
        assert_eq!(repo.list(&filter).await.unwrap()[0].name, "Northwind");

        let mut filter = AccountFilter::new(0, 100);
        filter.scope.workspace_id = Some(westpark);
        let in_westpark = repo.list(&filter).await.unwrap();
        assert_eq!(in_westpark.len(), 1);
        assert_eq!(in_westpark[0].name, "Contoso");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_workspace_is_foreign_key_violation(pool: PgPool) {
        setup_schema(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Accounts::new(&mut conn);

        let mut request = new_account("Orphan", "Retail");
        request.workspace_id = Some(999_999);
        let err = repo.create(&request).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
