//! Repository implementations
//!
//! PostgreSQL implementation of the `Directory` port defined in huddle-core.

mod directory;
mod error;

pub use directory::PgDirectory;
