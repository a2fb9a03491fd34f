//! Repository layer over the registry table.
//!
//! # Responsibility
//! - Define the registry data access contract.
//! - Isolate SQLite statements from callers.
//!
//! # Invariants
//! - Repository writes validate input before any statement runs.
//! - Duplicate aliases or paths surface as `RepoError::Db`, not as a
//!   dedicated error kind.

pub mod registration_repo;
