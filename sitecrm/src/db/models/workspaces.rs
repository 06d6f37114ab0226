//! Database models for workspaces.

use crate::api::models::workspaces::{WorkspaceCreate, WorkspaceUpdate};
use crate::types::WorkspaceId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct WorkspaceCreateDBRequest {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub monday_board_id: Option<String>,
    pub is_active: bool,
}

impl From<WorkspaceCreate> for WorkspaceCreateDBRequest {
    fn from(api: WorkspaceCreate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            color: api.color,
            monday_board_id: api.monday_board_id,
            is_active: api.is_active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkspaceUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub monday_board_id: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl From<WorkspaceUpdate> for WorkspaceUpdateDBRequest {
    fn from(api: WorkspaceUpdate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            color: api.color,
            monday_board_id: api.monday_board_id,
            is_active: api.is_active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct WorkspaceDBResponse {
    pub id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub monday_board_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
