//! Database models for opportunities.

use crate::api::models::{
    opportunities::{OpportunityCreate, OpportunityFields, OpportunityFieldsPatch, OpportunityUpdate},
    pipeline::{OpportunityStage, Pipeline},
};
use crate::types::{OpportunityId, UserId, WorkspaceId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct OpportunityCreateDBRequest {
    pub name: String,
    pub stage: OpportunityStage,
    pub fields: OpportunityFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

impl From<OpportunityCreate> for OpportunityCreateDBRequest {
    fn from(api: OpportunityCreate) -> Self {
        Self {
            name: api.name,
            stage: api.stage.unwrap_or(OpportunityStage::INITIAL),
            fields: api.fields,
            workspace_id: api.workspace_id,
            owner_id: api.owner_id,
            owner_name: api.owner_name,
            monday_item_id: api.monday_item_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OpportunityUpdateDBRequest {
    pub name: Option<String>,
    pub stage: Option<OpportunityStage>,
    pub fields: OpportunityFieldsPatch,
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<Option<String>>,
    pub monday_item_id: Option<Option<String>>,
}

impl From<OpportunityUpdate> for OpportunityUpdateDBRequest {
    fn from(api: OpportunityUpdate) -> Self {
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
pub struct OpportunityDBResponse {
    pub id: OpportunityId,
    pub name: String,
    pub stage: OpportunityStage,
    #[sqlx(flatten)]
    pub fields: OpportunityFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
