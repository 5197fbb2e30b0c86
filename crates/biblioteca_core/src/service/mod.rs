//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate model rules and storage into registry operations.
//! - Keep presentation layers decoupled from storage details.

pub mod registry;
