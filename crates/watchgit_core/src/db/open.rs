//! Registry connection lifecycle.
//!
//! # Responsibility
//! - Open an existing registry file and enforce the schema version gate.
//! - Bootstrap a missing registry file with schema and version stamp.
//! - Close connections and report close failures.
//!
//! # Invariants
//! - Returned connections carry `user_version == SCHEMA_VERSION`.
//! - Bootstrap is all-or-nothing: on failure the new file is removed.
//! - Existing files with a foreign stamp are left untouched.

use super::resolve::resolve_location;
use super::schema::{define_schema, read_version, stamp_version, SCHEMA_VERSION};
use super::{DbError, DbResult};
use crate::config::RegistryConfig;
use log::{error, info, warn};
use rusqlite::{Connection, OpenFlags};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

const MAX_SYMLINK_HOPS: usize = 40;

/// Resolves the configured location and opens the registry there.
///
/// # Side effects
/// - Creates the registry file when none exists.
/// - Emits `registry_open` logging events with duration and status.
pub fn open_registry(config: &RegistryConfig) -> DbResult<Connection> {
    let path = match resolve_location(config.location()) {
        Ok(path) => path,
        Err(err) => {
            error!(
                "event=registry_open module=db status=error error_code=location_unresolved error={}",
                err
            );
            return Err(err);
        }
    };
    open_registry_at(&path)
}

/// Opens the registry stored at an already-resolved `path`.
///
/// # Errors
/// - `DbError::Creation` when bootstrapping a new file fails.
/// - `DbError::Incompatible` when an existing file fails the version gate.
/// - `DbError::Io` when the file cannot be inspected.
/// - `DbError::Sqlite` when an existing file cannot be opened read-write.
pub fn open_registry_at(path: &Path) -> DbResult<Connection> {
    let started_at = Instant::now();

    let result = match std::fs::metadata(path) {
        Ok(_) => {
            info!("event=registry_open module=db status=start mode=existing");
            open_existing(path)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("event=registry_open module=db status=start mode=create");
            create_registry(path)
        }
        Err(err) => Err(DbError::Io {
            path: path.to_path_buf(),
            source: err,
        }),
    };

    match &result {
        Ok(_) => info!(
            "event=registry_open module=db status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=registry_open module=db status=error duration_ms={} error_code={} error={}",
            started_at.elapsed().as_millis(),
            error_code(err),
            err
        ),
    }
    result
}

/// Closes a registry connection.
///
/// Consumes the connection, so a handle cannot be closed twice.
pub fn close_registry(conn: Connection) -> DbResult<()> {
    match conn.close() {
        Ok(()) => {
            info!("event=registry_close module=db status=ok");
            Ok(())
        }
        Err((_conn, err)) => {
            error!(
                "event=registry_close module=db status=error error_code=db_close_failed error={}",
                err
            );
            Err(err.into())
        }
    }
}

fn open_existing(path: &Path) -> DbResult<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let found = read_version(&conn);
    if found == Some(SCHEMA_VERSION) {
        return Ok(conn);
    }

    warn!(
        "event=registry_version_gate module=db status=rejected found={} expected={}",
        found.map_or_else(|| "unreadable".to_string(), |v| v.to_string()),
        SCHEMA_VERSION
    );
    if let Err((_conn, err)) = conn.close() {
        warn!(
            "event=registry_close module=db status=error error_code=db_close_failed error={}",
            err
        );
    }
    Err(DbError::Incompatible {
        path: path.to_path_buf(),
        found,
        expected: SCHEMA_VERSION,
    })
}

fn create_registry(path: &Path) -> DbResult<Connection> {
    let creation_error = |source: rusqlite::Error| DbError::Creation {
        path: path.to_path_buf(),
        source,
    };

    // A dangling symlink is created through; cleanup must hit the new target.
    let created_file = link_target(path);
    let mut conn = Connection::open(path).map_err(creation_error)?;
    match bootstrap_schema(&mut conn) {
        Ok(()) => {
            info!(
                "event=registry_create module=db status=ok schema_version={}",
                SCHEMA_VERSION
            );
            Ok(conn)
        }
        Err(err) => {
            drop(conn);
            remove_partial_file(&created_file);
            Err(creation_error(err))
        }
    }
}

fn bootstrap_schema(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;
    define_schema(&tx)?;
    stamp_version(&tx, SCHEMA_VERSION)?;
    tx.commit()
}

/// Follows `path` through any chain of symlinks without requiring the final
/// target to exist.
fn link_target(path: &Path) -> PathBuf {
    let mut current = path.to_path_buf();
    for _ in 0..MAX_SYMLINK_HOPS {
        let Ok(target) = std::fs::read_link(&current) else {
            break;
        };
        current = match current.parent() {
            Some(parent) if target.is_relative() => parent.join(target),
            _ => target,
        };
    }
    current
}

fn remove_partial_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(
            "event=registry_create module=db status=error error_code=cleanup_failed error={}",
            err
        ),
    }
}

fn error_code(err: &DbError) -> &'static str {
    match err {
        DbError::Resolution { .. } => "location_unresolved",
        DbError::Creation { .. } => "db_create_failed",
        DbError::Incompatible { .. } => "schema_incompatible",
        DbError::Io { .. } => "db_stat_failed",
        DbError::Sqlite(_) => "db_open_failed",
        DbError::Visitor { .. } => "visitor_failed",
    }
}
