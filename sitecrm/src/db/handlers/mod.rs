//! Repository implementations for database access.
//!
//! This module provides repository structs for each table. Repositories follow a consistent
//! pattern and implement the [`Repository`] trait.
//!
//! # Design Pattern
//!
//! Each repository:
//! - Wraps a `&mut PgConnection`, so it runs equally well on a pooled connection or inside a
//!   transaction
//! - Provides strongly-typed CRUD operations plus a `count` matching its list filter
//! - Builds list queries with the shared helpers in [`filters`]
//! - Returns records from [`crate::db::models`]
//!
//! # Available Repositories
//!
//! - [`Users`]: accounts, email lookup and per-user checklist counts
//! - [`Workspaces`]: the seeded scope table
//! - [`Deals`], [`Leads`], [`Accounts`], [`Contacts`], [`Tasks`], [`Opportunities`]: CRM entities
//! - [`Checklists`]: site surveys, photo lists and board item ids
//! - [`Insights`]: read-only aggregates for the chat assistant
//!
//! # Common Pattern
//!
//! ```ignore
//! use sitecrm::db::handlers::{Deals, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = Deals::new(&mut tx);
//!
//!     let deal = repo.get_by_id(42).await?;
//!
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod checklists;
pub mod contacts;
pub mod deals;
pub mod filters;
pub mod insights;
pub mod leads;
pub mod opportunities;
pub mod repository;
pub mod tasks;
pub mod users;
pub mod workspaces;

pub use accounts::Accounts;
pub use checklists::Checklists;
pub use contacts::Contacts;
pub use deals::Deals;
pub use insights::Insights;
pub use leads::Leads;
pub use opportunities::Opportunities;
pub use repository::Repository;
pub use tasks::Tasks;
pub use users::Users;
pub use workspaces::Workspaces;
