//! API request/response models for accounts.

use super::pagination::Pagination;
use super::pipeline::AccountStatus;
use crate::db::models::accounts::AccountDBResponse;
use crate::types::{AccountId, UserId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, rust::double_option, serde_as};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AccountFields {
    pub label: Option<String>,
    pub industry: Option<String>,
    /// Free-form band, e.g. `11-50`
    pub employee_count: Option<String>,
    pub website: Option<String>,
    pub company_profile_url: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Partial update of [`AccountFields`]. A missing key leaves the column unchanged and an explicit
/// `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AccountFieldsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub label: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub industry: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub employee_count: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub website: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub company_profile_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountCreate {
    pub name: String,
    /// Defaults to `Prospect`
    pub status: Option<AccountStatus>,
    #[serde(flatten)]
    pub fields: AccountFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub status: Option<AccountStatus>,
    #[serde(flatten)]
    pub fields: AccountFieldsPatch,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub owner_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub monday_item_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: AccountId,
    pub name: String,
    pub status: AccountStatus,
    #[serde(flatten)]
    pub fields: AccountFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<AccountDBResponse> for AccountResponse {
    fn from(db: AccountDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            status: db.status,
            fields: db.fields,
            workspace_id: db.workspace_id,
            owner_id: db.owner_id,
            owner_name: db.owner_name,
            monday_item_id: db.monday_item_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing accounts
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListAccountsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub workspace_id: Option<WorkspaceId>,

    pub status: Option<AccountStatus>,
    pub label: Option<String>,
    pub industry: Option<String>,
    pub owner_name: Option<String>,

    /// Case-insensitive substring match on name, industry or website
    pub search: Option<String>,
}
