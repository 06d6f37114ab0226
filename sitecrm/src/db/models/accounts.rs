//! Database models for accounts.

use crate::api::models::{
    accounts::{AccountCreate, AccountFields, AccountFieldsPatch, AccountUpdate},
    pipeline::{AccountStatus, Pipeline},
};
use crate::types::{AccountId, UserId, WorkspaceId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub name: String,
    pub status: AccountStatus,
    pub fields: AccountFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

impl From<AccountCreate> for AccountCreateDBRequest {
    fn from(api: AccountCreate) -> Self {
        Self {
            name: api.name,
            status: api.status.unwrap_or(AccountStatus::INITIAL),
            fields: api.fields,
            workspace_id: api.workspace_id,
            owner_id: api.owner_id,
            owner_name: api.owner_name,
            monday_item_id: api.monday_item_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccountUpdateDBRequest {
    pub name: Option<String>,
    pub status: Option<AccountStatus>,
    pub fields: AccountFieldsPatch,
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<Option<String>>,
    pub monday_item_id: Option<Option<String>>,
}

impl From<AccountUpdate> for AccountUpdateDBRequest {
    fn from(api: AccountUpdate) -> Self {
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
pub struct AccountDBResponse {
    pub id: AccountId,
    pub name: String,
    pub status: AccountStatus,
    #[sqlx(flatten)]
    pub fields: AccountFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
