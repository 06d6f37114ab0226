//! Database models for site-survey checklists.

use crate::api::models::checklists::{ChecklistCreate, ChecklistFields, ChecklistFieldsPatch, ChecklistUpdate};
use crate::types::{ChecklistId, UserId, WorkspaceId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct ChecklistCreateDBRequest {
    pub site_name: String,
    pub fields: ChecklistFields,
    pub workspace_id: Option<WorkspaceId>,
    pub user_id: Option<UserId>,
    pub monday_item_id: Option<String>,
    pub westpark_item_id: Option<String>,
}

impl ChecklistCreateDBRequest {
    /// Surveys always belong to the user who created them.
    pub fn new(api: ChecklistCreate, user_id: UserId) -> Self {
        Self {
            site_name: api.site_name,
            fields: api.fields,
            workspace_id: api.workspace_id,
            user_id: Some(user_id),
            monday_item_id: None,
            westpark_item_id: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChecklistUpdateDBRequest {
    pub site_name: Option<String>,
    pub fields: ChecklistFieldsPatch,
    pub workspace_id: Option<Option<WorkspaceId>>,
}

impl From<ChecklistUpdate> for ChecklistUpdateDBRequest {
    fn from(api: ChecklistUpdate) -> Self {
        Self {
            site_name: api.site_name,
            fields: api.fields,
            workspace_id: api.workspace_id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ChecklistDBResponse {
    pub id: ChecklistId,
    pub site_name: String,
    #[sqlx(flatten)]
    pub fields: ChecklistFields,
    pub workspace_id: Option<WorkspaceId>,
    pub user_id: Option<UserId>,
    pub monday_item_id: Option<String>,
    pub westpark_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
