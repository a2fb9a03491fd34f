//! Registry domain model.
//!
//! # Responsibility
//! - Define the single persisted entity and its input rules.
//!
//! # Invariants
//! - Aliases and paths are each unique across the registry; storage
//!   enforces this, the model does not pre-check it.

pub mod registration;
