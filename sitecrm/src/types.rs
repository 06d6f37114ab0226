//! Common type definitions and permission vocabulary.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, WorkspaceId, etc.)
//! - Resource and operation enums used in authorization errors
//!
//! # ID Types
//!
//! Every table uses a `BIGSERIAL` primary key, so all IDs are `i64` aliases named after the
//! table they point into.
//!
//! # Operations
//!
//! `*All` operations touch every row and are admin only. `UpdateOwn` is the one scoped
//! operation a regular user can be refused: handing a record to another owner.

use std::fmt;

// Type aliases for IDs
pub type UserId = i64;
pub type WorkspaceId = i64;
pub type DealId = i64;
pub type LeadId = i64;
pub type AccountId = i64;
pub type ContactId = i64;
pub type TaskId = i64;
pub type OpportunityId = i64;
pub type ChecklistId = i64;

// Operations that can be performed on resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAll,
    ReadAll,
    UpdateAll,
    UpdateOwn,
    DeleteAll,
}

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Workspaces,
    Deals,
    Leads,
    Accounts,
    Contacts,
    Tasks,
    Opportunities,
    Checklists,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateAll => write!(f, "create"),
            Operation::ReadAll => write!(f, "read"),
            Operation::UpdateAll | Operation::UpdateOwn => write!(f, "update"),
            Operation::DeleteAll => write!(f, "delete"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Users => "users",
            Resource::Workspaces => "workspaces",
            Resource::Deals => "deals",
            Resource::Leads => "leads",
            Resource::Accounts => "accounts",
            Resource::Contacts => "contacts",
            Resource::Tasks => "tasks",
            Resource::Opportunities => "opportunities",
            Resource::Checklists => "checklists",
        };
        f.write_str(name)
    }
}
