//! Persistent repository registry for watchgit.
//! This crate owns the alias-to-path store and its invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::RegistryConfig;
pub use db::{
    close_registry, open_registry, open_registry_at, DbError, DbResult, VisitError, VisitResult,
    SCHEMA_VERSION,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::registration::{Registration, RegistrationId, RegistrationValidationError};
pub use repo::registration_repo::{
    add, for_alias, for_each, remove, RegistrationRepository, RepoError, RepoResult,
    SqliteRegistrationRepository,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
