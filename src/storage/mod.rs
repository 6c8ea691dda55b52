//! Storage module for SQLite database operations
//!
//! This module provides:
//! - Connection lifetime and scoped transactions
//! - Idempotent schema setup
//! - The paper repository

pub mod db;
pub mod paper_repo;

pub use db::{Database, open_database, DatabaseError, DatabaseResult};
pub use paper_repo::{PaperRepo, PaperFilter};
