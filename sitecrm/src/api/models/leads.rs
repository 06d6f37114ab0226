//! API request/response models for leads.

use super::pagination::Pagination;
use super::pipeline::LeadStatus;
use crate::db::models::leads::LeadDBResponse;
use crate::types::{LeadId, UserId, WorkspaceId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, rust::double_option, serde_as};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct LeadFields {
    pub priority: Option<String>,
    pub source: Option<String>,
    pub contact_name: Option<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub next_interaction_date: Option<NaiveDate>,
    pub qualified_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Partial update of [`LeadFields`]. A missing key leaves the column unchanged and an explicit
/// `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeadFieldsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub priority: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub source: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub contact_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub company_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub job_title: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub next_interaction_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub qualified_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeadCreate {
    pub name: String,
    /// Defaults to `New Lead`
    pub status: Option<LeadStatus>,
    #[serde(flatten)]
    pub fields: LeadFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LeadUpdate {
    pub name: Option<String>,
    pub status: Option<LeadStatus>,
    #[serde(flatten)]
    pub fields: LeadFieldsPatch,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub owner_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub monday_item_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeadResponse {
    pub id: LeadId,
    pub name: String,
    pub status: LeadStatus,
    #[serde(flatten)]
    pub fields: LeadFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<LeadDBResponse> for LeadResponse {
    fn from(db: LeadDBResponse) -> Self {
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

/// Query parameters for listing leads
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListLeadsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub workspace_id: Option<WorkspaceId>,

    pub status: Option<LeadStatus>,
    pub priority: Option<String>,
    pub source: Option<String>,
    pub owner_name: Option<String>,

    /// Case-insensitive substring match on name, company, contact or email
    pub search: Option<String>,
}
