//! Registration domain model.
//!
//! # Responsibility
//! - Define the alias-to-path record persisted in the registry.
//! - Validate caller input before it reaches any statement.
//!
//! # Invariants
//! - `id` is assigned by storage and never reused.
//! - `path` is absolute and symlink-resolved at insertion time.
//! - Aliases are non-empty single tokens without control characters.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Longest accepted alias, in bytes.
pub const MAX_ALIAS_BYTES: usize = 255;

/// Storage-assigned surrogate key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(pub i64);

impl Display for RegistrationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One tracked repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    /// Short user-chosen name, unique across the registry.
    pub alias: String,
    /// Canonical repository path, unique across the registry.
    pub path: PathBuf,
}

/// Input rejected before touching storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationValidationError {
    EmptyAlias,
    AliasTooLong { len: usize },
    /// Alias contains whitespace or a control character.
    InvalidAliasChar { ch: char },
    EmptyPath,
    /// Path contains a NUL byte, which no filesystem accepts.
    NulInPath,
    /// Canonical path is not valid UTF-8 and cannot be stored as text.
    NonUtf8Path,
}

impl Display for RegistrationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyAlias => write!(f, "alias cannot be empty"),
            Self::AliasTooLong { len } => {
                write!(f, "alias is {len} bytes; at most {MAX_ALIAS_BYTES} allowed")
            }
            Self::InvalidAliasChar { ch } => {
                write!(f, "alias cannot contain {:?}", ch)
            }
            Self::EmptyPath => write!(f, "path cannot be empty"),
            Self::NulInPath => write!(f, "path cannot contain NUL bytes"),
            Self::NonUtf8Path => write!(f, "path is not valid UTF-8"),
        }
    }
}

impl Error for RegistrationValidationError {}

/// Checks that `alias` is usable as a registry key.
pub fn validate_alias(alias: &str) -> Result<(), RegistrationValidationError> {
    if alias.is_empty() {
        return Err(RegistrationValidationError::EmptyAlias);
    }
    if alias.len() > MAX_ALIAS_BYTES {
        return Err(RegistrationValidationError::AliasTooLong { len: alias.len() });
    }
    if let Some(ch) = alias
        .chars()
        .find(|ch| ch.is_whitespace() || ch.is_control())
    {
        return Err(RegistrationValidationError::InvalidAliasChar { ch });
    }
    Ok(())
}

/// Checks raw path input before canonicalization.
pub fn validate_path_input(path: &Path) -> Result<(), RegistrationValidationError> {
    let raw = path.as_os_str();
    if raw.is_empty() {
        return Err(RegistrationValidationError::EmptyPath);
    }
    if raw.as_encoded_bytes().contains(&0) {
        return Err(RegistrationValidationError::NulInPath);
    }
    Ok(())
}
