//! Storage adapters for persisted library state.
//!
//! # Responsibility
//! - Define the persistence contract consumed by the registry.
//! - Isolate SQLite details from registry orchestration.
//!
//! # Invariants
//! - Malformed persisted data degrades to an empty registry, never an error.

pub mod book_store;
