//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authentication and visibility checks
//! - Business logic execution via database repositories
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`auth`]: Registration, login and the current user
//! - [`workspaces`]: Workspace listing and admin management
//! - [`deals`], [`leads`], [`accounts`], [`contacts`], [`tasks`], [`opportunities`]: CRM entity CRUD
//! - [`checklists`]: Site surveys, photo upload and board sync
//! - [`admin`]: Cross-user overviews for administrators
//! - [`chat`]: The pipeline assistant
//!
//! # Authentication
//!
//! Every handler except registration, login and the health check takes a
//! [`CurrentUser`](crate::api::models::users::CurrentUser), which is extracted from the bearer
//! token by [`crate::auth::current_user`].
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which automatically converts to
//! appropriate HTTP status codes and JSON error responses.

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod chat;
pub mod checklists;
pub mod contacts;
pub mod deals;
pub mod leads;
pub mod opportunities;
pub mod tasks;
pub mod workspaces;

use crate::errors::Error;

/// Reject names that are empty once trimmed.
pub(crate) fn ensure_name(name: &str) -> Result<(), Error> {
    if name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "name must not be empty".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn not_found(resource: &str, id: i64) -> Error {
    Error::NotFound {
        resource: resource.to_string(),
        id: id.to_string(),
    }
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn healthz() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_name() {
        assert!(ensure_name("Fit-out").is_ok());
        assert!(ensure_name("   ").is_err());
        assert!(ensure_name("").is_err());
    }
}
