//! API request/response models for contacts.

use super::pagination::Pagination;
use crate::db::models::contacts::ContactDBResponse;
use crate::types::{AccountId, ContactId, UserId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, rust::double_option, serde_as};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ContactFields {
    pub company: Option<String>,
    pub account_id: Option<AccountId>,
    pub contact_type: Option<String>,
    pub job_title: Option<String>,
    pub tier: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub location: Option<String>,
    pub source: Option<String>,
    /// How well the contact matches the ideal customer profile
    pub icp_fit: Option<String>,
    pub outreach_stage: Option<String>,
    pub about: Option<String>,
}

/// Partial update of [`ContactFields`]. A missing key leaves the column unchanged and an explicit
/// `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContactFieldsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub company: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub account_id: Option<Option<AccountId>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub contact_type: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub job_title: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub tier: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub linkedin_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub source: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub icp_fit: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub outreach_stage: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub about: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactCreate {
    pub name: String,
    #[serde(flatten)]
    pub fields: ContactFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ContactUpdate {
    pub name: Option<String>,
    #[serde(flatten)]
    pub fields: ContactFieldsPatch,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub owner_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub monday_item_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactResponse {
    pub id: ContactId,
    pub name: String,
    #[serde(flatten)]
    pub fields: ContactFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ContactDBResponse> for ContactResponse {
    fn from(db: ContactDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
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

/// Query parameters for listing contacts
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListContactsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub workspace_id: Option<WorkspaceId>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub account_id: Option<AccountId>,

    pub contact_type: Option<String>,
    pub icp_fit: Option<String>,
    pub tier: Option<String>,
    pub outreach_stage: Option<String>,
    pub owner_name: Option<String>,

    /// Case-insensitive substring match on name, company or email
    pub search: Option<String>,
}
