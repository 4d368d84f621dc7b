//! Database layer
//!
//! This module provides database abstraction for Inkpress. It supports:
//! - SQLite (default, for single-binary deployment and tests)
//! - PostgreSQL (for larger deployments)
//!
//! The database driver is selected based on configuration. A trait-based
//! abstraction (`DatabasePool`) lets repositories work with either backend
//! without the rest of the application knowing which is active.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, PostgresDatabase, SqliteDatabase,
};
