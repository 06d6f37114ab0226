//! Aggregate queries across the CRM tables.

use crate::api::models::pipeline::TaskStatus;
use crate::db::{
    errors::Result,
    handlers::filters::{push_eq, push_visibility},
    models::insights::{EntityCount, RecentDeal, StageTotal, StatusCount, WorkspaceSummary},
};
use crate::types::{UserId, WorkspaceId};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Tables counted in the summary, with the column that decides visibility.
const COUNTED: &[(&str, &str)] = &[
    ("deals", "owner_id"),
    ("leads", "owner_id"),
    ("accounts", "owner_id"),
    ("contacts", "owner_id"),
    ("tasks", "owner_id"),
    ("opportunities", "owner_id"),
    ("checklists", "user_id"),
];

const RECENT_DEALS: i64 = 5;

pub struct Insights<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Insights<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Summarise one workspace (or everything, when `workspace_id` is `None`) as seen by
    /// `visible_to`.
    #[instrument(skip(self), err)]
    pub async fn workspace_summary(&mut self, workspace_id: Option<WorkspaceId>, visible_to: Option<UserId>) -> Result<WorkspaceSummary> {
        let mut counts = Vec::with_capacity(COUNTED.len());
        for (table, owner_column) in COUNTED {
            let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT COUNT(*) FROM {table} WHERE 1=1"));
            push_eq(&mut query, "workspace_id", workspace_id);
            push_visibility(&mut query, owner_column, visible_to);
            let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
            counts.push(EntityCount { entity: table, count });
        }

        let mut query = QueryBuilder::new("SELECT stage, COUNT(*) AS count, SUM(value) AS total_value FROM deals WHERE 1=1");
        push_eq(&mut query, "workspace_id", workspace_id);
        push_visibility(&mut query, "owner_id", visible_to);
        query.push(" GROUP BY stage ORDER BY count DESC, stage");
        let deals_by_stage = query.build_query_as::<StageTotal>().fetch_all(&mut *self.db).await?;

        let mut query = QueryBuilder::new("SELECT name, stage, value, company_name FROM deals WHERE 1=1");
        push_eq(&mut query, "workspace_id", workspace_id);
        push_visibility(&mut query, "owner_id", visible_to);
        query.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        query.push_bind(RECENT_DEALS);
        let recent_deals = query.build_query_as::<RecentDeal>().fetch_all(&mut *self.db).await?;

        let mut query = QueryBuilder::new("SELECT status, COUNT(*) AS count FROM tasks WHERE status <> ");
        query.push_bind(TaskStatus::Done);
        push_eq(&mut query, "workspace_id", workspace_id);
        push_visibility(&mut query, "owner_id", visible_to);
        query.push(" GROUP BY status ORDER BY count DESC, status");
        let open_tasks = query.build_query_as::<StatusCount>().fetch_all(&mut *self.db).await?;

        Ok(WorkspaceSummary {
            counts,
            deals_by_stage,
            recent_deals,
            open_tasks,
        })
    }
}
