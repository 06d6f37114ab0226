//! Database models for tasks.

use crate::api::models::{
    pipeline::{Pipeline, TaskStatus},
    tasks::{TaskCreate, TaskFields, TaskFieldsPatch, TaskUpdate},
};
use crate::types::{TaskId, UserId, WorkspaceId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct TaskCreateDBRequest {
    pub name: String,
    pub status: TaskStatus,
    pub fields: TaskFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

impl From<TaskCreate> for TaskCreateDBRequest {
    fn from(api: TaskCreate) -> Self {
        Self {
            name: api.name,
            status: api.status.unwrap_or(TaskStatus::INITIAL),
            fields: api.fields,
            workspace_id: api.workspace_id,
            owner_id: api.owner_id,
            owner_name: api.owner_name,
            monday_item_id: api.monday_item_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskUpdateDBRequest {
    pub name: Option<String>,
    pub status: Option<TaskStatus>,
    pub fields: TaskFieldsPatch,
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<Option<String>>,
    pub monday_item_id: Option<Option<String>>,
}

impl From<TaskUpdate> for TaskUpdateDBRequest {
    fn from(api: TaskUpdate) -> Self {
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
pub struct TaskDBResponse {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    #[sqlx(flatten)]
    pub fields: TaskFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
