//! Database models for deals.

use crate::api::models::{
    deals::{DealCreate, DealFields, DealFieldsPatch, DealUpdate},
    pipeline::{DealStage, Pipeline},
};
use crate::types::{DealId, UserId, WorkspaceId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct DealCreateDBRequest {
    pub name: String,
    pub stage: DealStage,
    pub fields: DealFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

impl From<DealCreate> for DealCreateDBRequest {
    fn from(api: DealCreate) -> Self {
        Self {
            name: api.name,
            stage: api.stage.unwrap_or(DealStage::INITIAL),
            fields: api.fields,
            workspace_id: api.workspace_id,
            owner_id: api.owner_id,
            owner_name: api.owner_name,
            monday_item_id: api.monday_item_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DealUpdateDBRequest {
    pub name: Option<String>,
    pub stage: Option<DealStage>,
    pub fields: DealFieldsPatch,
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<Option<String>>,
    pub monday_item_id: Option<Option<String>>,
}

impl From<DealUpdate> for DealUpdateDBRequest {
    fn from(api: DealUpdate) -> Self {
        Self {
            name: api.name,
            stage: api.stage,
            fields: api.fields,
            workspace_id: api.workspace_id,
            owner_id: api.owner_id,
            owner_name: api.owner_name,
            monday_item_id: api.monday_item_id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DealDBResponse {
    pub id: DealId,
    pub name: String,
    pub stage: DealStage,
    #[sqlx(flatten)]
    pub fields: DealFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
