//! Authentication and authorization.
//!
//! Callers authenticate with `POST /auth/login` (or `/auth/register` when registration is
//! enabled) and receive a signed JWT. Every other protected route expects it back as
//! `Authorization: Bearer <token>`.
//!
//! # Authorization
//!
//! There are two roles. Admins see and edit every record. Regular users see records they own
//! plus unowned records, and may not hand records to somebody else. See [`permissions`].
//!
//! # Modules
//!
//! - [`current_user`]: the [`CurrentUser`](crate::api::models::users::CurrentUser) extractor
//! - [`password`]: Argon2 hashing and password policy
//! - [`permissions`]: role checks and owner scoping
//! - [`session`]: JWT creation and verification
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use sitecrm::api::models::users::CurrentUser;
//!
//! async fn protected_handler(current_user: CurrentUser) -> String {
//!     format!("Hello, {}!", current_user.email)
//! }
//! ```

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
