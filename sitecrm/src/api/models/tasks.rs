//! API request/response models for tasks.

use super::pagination::Pagination;
use super::pipeline::TaskStatus;
use crate::db::models::tasks::TaskDBResponse;
use crate::types::{AccountId, ContactId, DealId, LeadId, TaskId, UserId, WorkspaceId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, rust::double_option, serde_as};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct TaskFields {
    pub priority: Option<String>,
    pub task_type: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    /// Free-text description of what the task concerns
    pub related_to: Option<String>,
    pub deal_id: Option<DealId>,
    pub lead_id: Option<LeadId>,
    pub account_id: Option<AccountId>,
    pub contact_id: Option<ContactId>,
    pub notes: Option<String>,
}

/// Partial update of [`TaskFields`]. A missing key leaves the column unchanged and an explicit
/// `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskFieldsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub priority: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub task_type: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub close_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub related_to: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub deal_id: Option<Option<DealId>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub lead_id: Option<Option<LeadId>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub account_id: Option<Option<AccountId>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub contact_id: Option<Option<ContactId>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskCreate {
    pub name: String,
    /// Defaults to `To do`
    pub status: Option<TaskStatus>,
    #[serde(flatten)]
    pub fields: TaskFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub status: Option<TaskStatus>,
    #[serde(flatten)]
    pub fields: TaskFieldsPatch,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub owner_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub monday_item_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    #[serde(flatten)]
    pub fields: TaskFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<TaskDBResponse> for TaskResponse {
    fn from(db: TaskDBResponse) -> Self {
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

/// Query parameters for listing tasks
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListTasksQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub workspace_id: Option<WorkspaceId>,

    pub status: Option<TaskStatus>,
    pub priority: Option<String>,
    pub task_type: Option<String>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub deal_id: Option<DealId>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub lead_id: Option<LeadId>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub account_id: Option<AccountId>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub contact_id: Option<ContactId>,

    pub owner_name: Option<String>,

    /// Case-insensitive substring match on name, related_to or notes
    pub search: Option<String>,
}
