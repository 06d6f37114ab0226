//! Database record models matching table schemas.
//!
//! Each module holds the create request, update request and row type for one table. Row types
//! derive [`sqlx::FromRow`]; the free-form payload columns are shared with the API layer through
//! `#[sqlx(flatten)]`, so adding a column means touching one struct and the repository's SQL.
//!
//! Create and update requests are built from API bodies with `From` conversions, after the
//! handler has resolved ownership.

pub mod accounts;
pub mod checklists;
pub mod contacts;
pub mod deals;
pub mod insights;
pub mod leads;
pub mod opportunities;
pub mod tasks;
pub mod users;
pub mod workspaces;
