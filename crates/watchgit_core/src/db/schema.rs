//! Registry table layout and version stamp.
//!
//! # Responsibility
//! - Create the `repositories` table.
//! - Write and read the schema version kept in `PRAGMA user_version`.
//!
//! # Invariants
//! - The version gate is exact equality; there is no upgrade path.
//! - `read_version` never errors: anything unexpected reads as `None`.

use super::rows::{visit_rows, VisitError};
use log::debug;
use rusqlite::Connection;

/// Schema version implemented by this build.
pub const SCHEMA_VERSION: u32 = 1;

const VERSION_COLUMN: &str = "user_version";

/// Creates the registry table when absent.
pub fn define_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(include_str!("registry.sql"))
}

/// Records `version` in the registry file header.
pub fn stamp_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
}

/// Reads the stamped version.
///
/// Returns `None` when the pragma query fails, returns an unexpected shape
/// (column count or name), or carries a value that is not a non-negative
/// integer.
pub fn read_version(conn: &Connection) -> Option<u32> {
    match try_read_version(conn) {
        Ok(version) => Some(version),
        Err(reason) => {
            debug!("event=registry_version_read module=db status=error error={reason}");
            None
        }
    }
}

fn try_read_version(conn: &Connection) -> Result<u32, String> {
    let mut version = None;
    let rows = visit_rows(conn, "PRAGMA user_version;", [], |column, value| {
        if column != VERSION_COLUMN {
            return Err(VisitError::new(format!("unexpected column `{column}`")));
        }
        if version.is_some() {
            return Err(VisitError::new("more than one version column"));
        }
        let parsed = value
            .parse::<u32>()
            .map_err(|_| VisitError::new(format!("non-numeric version `{value}`")))?;
        version = Some(parsed);
        Ok(())
    });

    match (rows, version) {
        (Ok(1), Some(version)) => Ok(version),
        (Ok(count), _) => Err(format!("version query returned {count} rows")),
        (Err(err), _) => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{define_schema, read_version, stamp_version, try_read_version, SCHEMA_VERSION};
    use rusqlite::Connection;

    #[test]
    fn fresh_connection_reads_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_version(&conn), Some(0));
    }

    #[test]
    fn stamp_then_read_returns_stamped_value() {
        let conn = Connection::open_in_memory().unwrap();
        define_schema(&conn).unwrap();
        stamp_version(&conn, SCHEMA_VERSION).unwrap();
        assert_eq!(read_version(&conn), Some(SCHEMA_VERSION));

        stamp_version(&conn, 7).unwrap();
        assert_eq!(read_version(&conn), Some(7));
    }

    #[test]
    fn negative_stamp_is_invalid() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = -3;").unwrap();
        assert_eq!(read_version(&conn), None);
    }

    #[test]
    fn define_schema_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        define_schema(&conn).unwrap();
        define_schema(&conn).unwrap();

        let columns: Vec<String> = conn
            .prepare("SELECT name FROM pragma_table_info('repositories') ORDER BY cid")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(columns, vec!["id", "alias", "path"]);
    }

    #[test]
    fn unreadable_file_keeps_the_engine_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, b"definitely not a sqlite header, just text. ".repeat(8)).unwrap();
        let conn = Connection::open(&path).unwrap();

        let reason = try_read_version(&conn).unwrap_err();
        assert!(reason.contains("not a database"), "{reason}");
        assert_eq!(read_version(&conn), None);
    }

    #[test]
    fn non_numeric_stamp_names_the_column_failure() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = -1;").unwrap();

        let reason = try_read_version(&conn).unwrap_err();
        assert!(reason.contains("user_version"), "{reason}");
        assert!(reason.contains("-1"), "{reason}");
    }
}
