//! Persistence layer for the Squadra backend.
//!
//! This crate contains:
//! - Connection pool management and embedded migrations
//! - Entity definitions (database row mappings)
//! - PostgreSQL implementations of the domain ports
//! - An in-process store implementing the same ports

pub mod db;
pub mod entities;
pub mod memory;
pub mod metrics;
pub mod repositories;

pub use memory::MemoryStore;
