//! Database connection pool management

mod postgres;

pub use postgres::{create_pool, pool_options};
pub use sqlx::postgres::PgPool;
