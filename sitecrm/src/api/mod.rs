//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/auth/*`): registration, login, the current user
//! - **Workspaces** (`/workspaces/*`): listing for everyone, changes for admins
//! - **CRM records** (`/deals`, `/leads`, `/accounts`, `/contacts`, `/tasks`, `/opportunities`):
//!   CRUD with filters, owner scoping and stage/status transition rules
//! - **Site surveys** (`/checklists/*`): CRUD, photo upload and Monday.com sync
//! - **Admin** (`/admin/*`): cross-user listings
//! - **Chat** (`/chat`): the pipeline assistant
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
