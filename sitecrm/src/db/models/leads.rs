//! Database models for leads.

use crate::api::models::{
    leads::{LeadCreate, LeadFields, LeadFieldsPatch, LeadUpdate},
    pipeline::{LeadStatus, Pipeline},
};
use crate::types::{LeadId, UserId, WorkspaceId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct LeadCreateDBRequest {
    pub name: String,
    pub status: LeadStatus,
    pub fields: LeadFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

impl From<LeadCreate> for LeadCreateDBRequest {
    fn from(api: LeadCreate) -> Self {
        Self {
            name: api.name,
            status: api.status.unwrap_or(LeadStatus::INITIAL),
            fields: api.fields,
            workspace_id: api.workspace_id,
            owner_id: api.owner_id,
            owner_name: api.owner_name,
            monday_item_id: api.monday_item_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeadUpdateDBRequest {
    pub name: Option<String>,
    pub status: Option<LeadStatus>,
    pub fields: LeadFieldsPatch,
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<Option<String>>,
    pub monday_item_id: Option<Option<String>>,
}

impl From<LeadUpdate> for LeadUpdateDBRequest {
    fn from(api: LeadUpdate) -> Self {
        Self {
            name: api.name,
            status: api.status,
            fields: api.fields,
            workspace_id: api.workspace_id,
            owner_id: api.owner_id,
            owner_name: api.owner_name,
            monday_item_id: api.monday_item_id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct LeadDBResponse {
    pub id: LeadId,
    pub name: String,
    pub status: LeadStatus,
    #[sqlx(flatten)]
    pub fields: LeadFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
