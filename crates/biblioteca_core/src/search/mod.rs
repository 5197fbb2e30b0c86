//! Book list search.
//!
//! # Responsibility
//! - Derive filtered, order-preserving views of the registry.

pub mod filter;
