//! Registry configuration.
//!
//! # Responsibility
//! - Carry the registry location into the connection lifecycle explicitly.
//!
//! # Invariants
//! - The location is stored unexpanded; expansion happens once per open.

use serde::{Deserialize, Serialize};

/// Default registry location, a dotfile in the user's home directory.
pub const DEFAULT_REGISTRY_LOCATION: &str = "~/.watchgit.db";

/// Environment variable that overrides the default location.
pub const REGISTRY_LOCATION_ENV: &str = "WATCHGIT_DB";

/// Where the registry file lives.
///
/// `location` may use `~` and `$NAME` / `${NAME}` references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    location: String,
}

impl RegistryConfig {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    /// Uses `WATCHGIT_DB` when set and non-empty, otherwise the default.
    pub fn from_env() -> Self {
        match std::env::var(REGISTRY_LOCATION_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::new(value),
            _ => Self::default(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_LOCATION)
    }
}
