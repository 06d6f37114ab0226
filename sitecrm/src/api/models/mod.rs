//! API request and response data models.
//!
//! This module contains the data structures used for HTTP request deserialization
//! and response serialization. These models define the public API contract.
//!
//! # Design Principles
//!
//! - **Separation of Concerns**: API models are distinct from database models,
//!   allowing independent evolution of API and storage representations
//! - **Closed vocabularies**: stages and statuses are enums from [`pipeline`], so an unknown
//!   label is rejected at deserialization
//! - **OpenAPI**: All models are annotated with `utoipa` for automatic API docs
//!
//! # Model Categories
//!
//! ## CRM Records
//!
//! - [`deals`], [`leads`], [`accounts`], [`contacts`], [`tasks`], [`opportunities`]
//! - [`checklists`]: site surveys
//! - [`workspaces`]: the scope records belong to
//!
//! ## Shared
//!
//! - [`pagination`]: `skip`/`limit` parameters and the list envelope
//! - [`pipeline`]: stage and status enums with their transition tables
//!
//! ## Access
//!
//! - [`auth`]: registration, login and token payloads
//! - [`users`]: user profiles, roles and the authenticated caller
//! - [`chat`]: assistant conversation payloads

pub mod accounts;
pub mod auth;
pub mod chat;
pub mod checklists;
pub mod contacts;
pub mod deals;
pub mod leads;
pub mod opportunities;
pub mod pagination;
pub mod pipeline;
pub mod tasks;
pub mod users;
pub mod workspaces;
