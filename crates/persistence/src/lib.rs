//! Persistence layer for the LMS maintenance worker.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations of the domain store traits
//! - The per-iteration store scope provider

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod scope;

pub use scope::PgStoreProvider;
