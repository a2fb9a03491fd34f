//! SQLite registry bootstrap, schema gate and row delivery entry points.
//!
//! # Responsibility
//! - Resolve the configured registry location to one absolute path.
//! - Open an existing registry or bootstrap a new one.
//! - Deliver query results through the row visitor protocol.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - A connection is only handed out after the version gate passed.
//! - A failed bootstrap never leaves a half-initialized file behind.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod open;
pub mod resolve;
pub mod rows;
pub mod schema;

pub use open::{close_registry, open_registry, open_registry_at};
pub use resolve::resolve_location;
pub use rows::{visit_rows, VisitError, VisitResult};
pub use schema::SCHEMA_VERSION;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Configured location cannot be expanded to exactly one path.
    Resolution { location: String, reason: String },
    /// New registry file or its schema could not be written.
    Creation {
        path: PathBuf,
        source: rusqlite::Error,
    },
    /// Existing file carries a missing, unreadable or foreign version stamp.
    Incompatible {
        path: PathBuf,
        found: Option<u32>,
        expected: u32,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Sqlite(rusqlite::Error),
    /// First failing column reported by a row visitor.
    Visitor {
        row: usize,
        column: String,
        source: VisitError,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolution { location, reason } => {
                write!(f, "cannot resolve registry location `{location}`: {reason}")
            }
            Self::Creation { path, source } => write!(
                f,
                "failed to create registry `{}`: {source}",
                path.display()
            ),
            Self::Incompatible {
                path,
                found: Some(found),
                expected,
            } => write!(
                f,
                "corrupt registry or old schema at `{}`: schema version {found}, expected {expected}",
                path.display()
            ),
            Self::Incompatible {
                path,
                found: None,
                expected,
            } => write!(
                f,
                "corrupt registry or old schema at `{}`: schema version unreadable, expected {expected}",
                path.display()
            ),
            Self::Io { path, source } => write!(f, "cannot stat `{}`: {source}", path.display()),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Visitor {
                row,
                column,
                source,
            } => write!(f, "visitor rejected row {row} column `{column}`: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Resolution { .. } => None,
            Self::Creation { source, .. } => Some(source),
            Self::Incompatible { .. } => None,
            Self::Io { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::Visitor { source, .. } => Some(source),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
