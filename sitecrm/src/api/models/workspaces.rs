//! API request/response models for workspaces.

use super::pagination::Pagination;
use crate::db::models::workspaces::WorkspaceDBResponse;
use crate::types::WorkspaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, rust::double_option, serde_as};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceCreate {
    pub name: String,
    pub description: Option<String>,
    /// Hex colour used by the frontend, e.g. `#6366f1`
    pub color: Option<String>,
    pub monday_board_id: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceUpdate {
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub monday_board_id: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceResponse {
    pub id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub monday_board_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<WorkspaceDBResponse> for WorkspaceResponse {
    fn from(db: WorkspaceDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            color: db.color,
            monday_board_id: db.monday_board_id,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing workspaces
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListWorkspacesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Only return active (or inactive) workspaces
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub is_active: Option<bool>,

    /// Case-insensitive substring match on name or description
    pub search: Option<String>,
}
