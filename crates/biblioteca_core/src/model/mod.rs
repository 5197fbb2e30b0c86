//! Domain model for the library inventory.
//!
//! # Responsibility
//! - Define the canonical book record and its loan history.
//! - Normalize untrusted records loaded from storage or imported by users.
//!
//! # Invariants
//! - Every book is identified by an id unique within the registry.
//! - Loan history is append-only.

pub mod book;
pub mod sanitize;
