//! Read-only aggregates used to brief the chat assistant.

use crate::api::models::pipeline::{DealStage, TaskStatus};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// Number of rows for one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCount {
    pub entity: &'static str,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct StageTotal {
    pub stage: DealStage,
    pub count: i64,
    pub total_value: Option<Decimal>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecentDeal {
    pub name: String,
    pub stage: DealStage,
    pub value: Option<Decimal>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: i64,
}

/// Snapshot of a workspace's pipeline.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSummary {
    pub counts: Vec<EntityCount>,
    pub deals_by_stage: Vec<StageTotal>,
    pub recent_deals: Vec<RecentDeal>,
    pub open_tasks: Vec<StatusCount>,
}
