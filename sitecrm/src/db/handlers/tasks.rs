//! Database repository for tasks.

use crate::api::models::{tasks::TaskFieldsPatch, pipeline::TaskStatus};
use crate::db::{
    errors::{DbError, Result},
    handlers::{
        filters::{ScopeFilter, push_eq, push_page, push_scope, push_set, push_update_target},
        repository::Repository,
    },
    models::tasks::{TaskCreateDBRequest, TaskDBResponse, TaskUpdateDBRequest},
};
use crate::types::{AccountId, ContactId, DealId, LeadId, TaskId};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["name", "related_to", "notes"];

/// Filter for listing tasks
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub skip: i64,
    pub limit: i64,
    pub scope: ScopeFilter,
    pub status: Option<TaskStatus>,
    pub priority: Option<String>,
    pub task_type: Option<String>,
    pub deal_id: Option<DealId>,
    pub lead_id: Option<LeadId>,
    pub account_id: Option<AccountId>,
    pub contact_id: Option<ContactId>,
}

impl TaskFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Postgres>, filter: &'a TaskFilter) {
    push_scope(query, &filter.scope, SEARCH_COLUMNS);
    push_eq(query, "status", filter.status);
    push_eq(query, "priority", filter.priority.as_deref());
    push_eq(query, "task_type", filter.task_type.as_deref());
    push_eq(query, "deal_id", filter.deal_id);
    push_eq(query, "lead_id", filter.lead_id);
    push_eq(query, "account_id", filter.account_id);
    push_eq(query, "contact_id", filter.contact_id);
}

fn push_field_updates<'a>(query: &mut QueryBuilder<'a, Postgres>, f: &'a TaskFieldsPatch) {
    push_set(query, "priority", f.priority.as_ref().map(Option::as_deref));
    push_set(query, "task_type", f.task_type.as_ref().map(Option::as_deref));
    push_set(query, "due_date", f.due_date);
    push_set(query, "close_date", f.close_date);
    push_set(query, "related_to", f.related_to.as_ref().map(Option::as_deref));
    push_set(query, "deal_id", f.deal_id);
    push_set(query, "lead_id", f.lead_id);
    push_set(query, "account_id", f.account_id);
    push_set(query, "contact_id", f.contact_id);
    push_set(query, "notes", f.notes.as_ref().map(Option::as_deref));
}

pub struct Tasks<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Tasks<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &TaskFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM tasks WHERE 1=1");
        push_filters(&mut query, filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Tasks<'c> {
    type CreateRequest = TaskCreateDBRequest;
    type UpdateRequest = TaskUpdateDBRequest;
    type Response = TaskDBResponse;
    type Id = TaskId;
    type Filter = TaskFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let f = &request.fields;
        let task = sqlx::query_as::<_, TaskDBResponse>(
            r#"
            INSERT INTO tasks (
                name, status, priority, task_type, due_date, close_date, related_to,
                deal_id, lead_id, account_id, contact_id, notes,
                workspace_id, owner_id, owner_name, monday_item_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(request.status)
        .bind(&f.priority)
        .bind(&f.task_type)
        .bind(f.due_date)
        .bind(f.close_date)
        .bind(&f.related_to)
        .bind(f.deal_id)
        .bind(f.lead_id)
        .bind(f.account_id)
        .bind(f.contact_id)
        .bind(&f.notes)
        .bind(request.workspace_id)
        .bind(request.owner_id)
        .bind(&request.owner_name)
        .bind(&request.monday_item_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(task)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let task = sqlx::query_as::<_, TaskDBResponse>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(task)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM tasks WHERE 1=1");
        push_filters(&mut query, filter);
        push_page(&mut query, filter.skip, filter.limit);

        let tasks = query.build_query_as::<TaskDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(tasks)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut query = QueryBuilder::new("UPDATE tasks SET updated_at = NOW()");
        push_set(&mut query, "name", request.name.as_deref());
        push_set(&mut query, "status", request.status);
        push_field_updates(&mut query, &request.fields);
        push_set(&mut query, "workspace_id", request.workspace_id);
        push_set(&mut query, "owner_id", request.owner_id);
        push_set(&mut query, "owner_name", request.owner_name.as_ref().map(Option::as_deref));
        push_set(&mut query, "monday_item_id", request.monday_item_id.as_ref().map(Option::as_deref));
        push_update_target(&mut query, id);

        let task = query
            .build_query_as::<TaskDBResponse>()
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(task)
    }
}
