//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD operations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//! - [`reconcile`]: Startup schema reconciliation
//!
//! # Transactions
//!
//! Repositories take `&mut PgConnection`. Handlers that read a row and then write it (stage
//! transitions, ownership checks) open a transaction so the check and the write see the same
//! row:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Deals::new(&mut tx);
//! let current = repo.get_by_id(id).await?;
//! // ... validate ...
//! repo.update(id, &request).await?;
//! tx.commit().await?;
//! ```
//!
//! # Schema
//!
//! There are no migration files. The expected schema is declared in
//! [`reconcile::schema`] and applied at startup by [`reconcile::run_reconciler`], which creates
//! missing tables, adds missing columns and repairs data in place.

pub mod errors;
pub mod handlers;
pub mod models;
pub mod reconcile;
