//! # huddle-db
//!
//! PostgreSQL implementation of the `Directory` port from `huddle-core`.
//!
//! ## Overview
//!
//! The fan-out core only reads from the relational store: user names, workspace and
//! conversation membership. This crate handles:
//!
//! - Connection pool management
//! - Row models with SQLx `FromRow` derives
//! - Row to entity mappers
//! - The `PgDirectory` lookups
//!
//! Soft-deleted workspaces and conversations grant no membership.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use huddle_common::AppConfig;
//! use huddle_core::Directory;
//! use huddle_db::{create_pool, PgDirectory};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let pool = create_pool(&config.database).await?;
//!     let directory = PgDirectory::new(pool);
//!
//!     let allowed = directory
//!         .is_conversation_member(42.into(), 7.into())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, pool_options, PgPool};
pub use repositories::PgDirectory;
