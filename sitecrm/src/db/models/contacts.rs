//! Database models for contacts.

use crate::api::models::contacts::{ContactCreate, ContactFields, ContactFieldsPatch, ContactUpdate};
use crate::types::{ContactId, UserId, WorkspaceId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct ContactCreateDBRequest {
    pub name: String,
    pub fields: ContactFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

impl From<ContactCreate> for ContactCreateDBRequest {
    fn from(api: ContactCreate) -> Self {
        Self {
            name: api.name,
            fields: api.fields,
            workspace_id: api.workspace_id,
            owner_id: api.owner_id,
            owner_name: api.owner_name,
            monday_item_id: api.monday_item_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContactUpdateDBRequest {
    pub name: Option<String>,
    pub fields: ContactFieldsPatch,
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<Option<String>>,
    pub monday_item_id: Option<Option<String>>,
}

impl From<ContactUpdate> for ContactUpdateDBRequest {
    fn from(api: ContactUpdate) -> Self {
        Self {
            name: api.name,
            fields: api.fields,
            workspace_id: api.workspace_id,
            owner_id: api.owner_id,
            owner_name: api.owner_name,
            monday_item_id: api.monday_item_id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ContactDBResponse {
    pub id: ContactId,
    pub name: String,
    #[sqlx(flatten)]
    pub fields: ContactFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
