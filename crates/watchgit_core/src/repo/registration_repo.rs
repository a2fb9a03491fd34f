//! Registration repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide add/remove/list/lookup over the `repositories` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Every statement binds caller values; no SQL text is built from input.
//! - Add canonicalizes the path before insertion.
//! - Uniqueness is enforced by storage and surfaces as a database error.

use crate::db::{visit_rows, DbError, VisitResult};
use crate::model::registration::{
    validate_alias, validate_path_input, Registration, RegistrationId,
    RegistrationValidationError,
};
use log::{debug, error, info};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

const INSERT_SQL: &str = "INSERT INTO repositories (alias, path) VALUES (?1, ?2);";
const DELETE_BY_ALIAS_SQL: &str = "DELETE FROM repositories WHERE alias = ?1;";
const SELECT_ALL_SQL: &str = "SELECT alias, path FROM repositories ORDER BY alias ASC;";
const SELECT_PATH_BY_ALIAS_SQL: &str = "SELECT path FROM repositories WHERE alias = ?1;";
const SELECT_ROWS_SQL: &str = "SELECT id, alias, path FROM repositories";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for registration persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(RegistrationValidationError),
    /// Input path does not exist or cannot be canonicalized.
    PathResolution {
        path: PathBuf,
        source: std::io::Error,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::PathResolution { path, source } => {
                write!(f, "cannot resolve path `{}`: {source}", path.display())
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted registration data: {message}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::PathResolution { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<RegistrationValidationError> for RepoError {
    fn from(value: RegistrationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for registry operations.
pub trait RegistrationRepository {
    /// Registers `alias` for the canonical form of `path`.
    fn add_registration(&self, alias: &str, path: &Path) -> RepoResult<RegistrationId>;

    /// Deletes the registration named `alias`; returns rows removed.
    ///
    /// Removing an unknown alias is not an error.
    fn remove_registration(&self, alias: &str) -> RepoResult<usize>;

    /// Visits `alias` and `path` of every registration, ordered by alias.
    fn for_each_registration<F>(&self, visitor: F) -> RepoResult<usize>
    where
        F: FnMut(&str, &str) -> VisitResult;

    /// Visits the `path` column of registrations named `alias`.
    fn for_alias<F>(&self, alias: &str, visitor: F) -> RepoResult<usize>
    where
        F: FnMut(&str, &str) -> VisitResult;

    fn list_registrations(&self) -> RepoResult<Vec<Registration>>;

    fn find_by_alias(&self, alias: &str) -> RepoResult<Option<Registration>>;
}

/// SQLite-backed registration repository.
pub struct SqliteRegistrationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegistrationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SqliteRegistrationRepository<'_> {
    fn insert(&self, alias: &str, path: &Path) -> RepoResult<RegistrationId> {
        validate_alias(alias)?;
        validate_path_input(path)?;

        let canonical = std::fs::canonicalize(path).map_err(|source| RepoError::PathResolution {
            path: path.to_path_buf(),
            source,
        })?;
        let canonical_text = canonical
            .to_str()
            .ok_or(RegistrationValidationError::NonUtf8Path)?;

        self.conn.execute(INSERT_SQL, params![alias, canonical_text])?;
        Ok(RegistrationId(self.conn.last_insert_rowid()))
    }

    fn select_rows(&self, filter: &str, alias: Option<&str>) -> RepoResult<Vec<Registration>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_ROWS_SQL}{filter}"))?;
        let mut rows = match alias {
            Some(alias) => stmt.query([alias])?,
            None => stmt.query([])?,
        };
        let mut registrations = Vec::new();

        while let Some(row) = rows.next()? {
            registrations.push(parse_registration_row(row)?);
        }

        Ok(registrations)
    }
}

impl RegistrationRepository for SqliteRegistrationRepository<'_> {
    fn add_registration(&self, alias: &str, path: &Path) -> RepoResult<RegistrationId> {
        let started_at = Instant::now();
        debug!("event=registration_add module=repo status=start");

        let result = self.insert(alias, path);
        match &result {
            Ok(id) => info!(
                "event=registration_add module=repo status=ok duration_ms={} id={id}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("registration_add", "", started_at, err),
        }
        result
    }

    fn remove_registration(&self, alias: &str) -> RepoResult<usize> {
        let started_at = Instant::now();
        debug!("event=registration_remove module=repo status=start");

        match self.conn.execute(DELETE_BY_ALIAS_SQL, [alias]) {
            Ok(removed) => {
                info!(
                    "event=registration_remove module=repo status=ok duration_ms={} removed={removed}",
                    started_at.elapsed().as_millis()
                );
                Ok(removed)
            }
            Err(err) => {
                let err = RepoError::from(err);
                log_failure("registration_remove", "", started_at, &err);
                Err(err)
            }
        }
    }

    fn for_each_registration<F>(&self, visitor: F) -> RepoResult<usize>
    where
        F: FnMut(&str, &str) -> VisitResult,
    {
        let started_at = Instant::now();
        debug!("event=registration_list module=repo status=start mode=all");

        let result = visit_rows(self.conn, SELECT_ALL_SQL, [], visitor).map_err(RepoError::from);
        log_list_outcome("all", started_at, result.as_ref().copied());
        result
    }

    fn for_alias<F>(&self, alias: &str, visitor: F) -> RepoResult<usize>
    where
        F: FnMut(&str, &str) -> VisitResult,
    {
        let started_at = Instant::now();
        debug!("event=registration_list module=repo status=start mode=alias");

        let result = visit_rows(self.conn, SELECT_PATH_BY_ALIAS_SQL, [alias], visitor)
            .map_err(RepoError::from);
        log_list_outcome("alias", started_at, result.as_ref().copied());
        result
    }

    fn list_registrations(&self) -> RepoResult<Vec<Registration>> {
        let started_at = Instant::now();
        debug!("event=registration_list module=repo status=start mode=typed_all");

        let result = self.select_rows(" ORDER BY alias ASC;", None);
        log_list_outcome("typed_all", started_at, result.as_ref().map(Vec::len));
        result
    }

    fn find_by_alias(&self, alias: &str) -> RepoResult<Option<Registration>> {
        let started_at = Instant::now();
        debug!("event=registration_list module=repo status=start mode=typed_alias");

        let result = self
            .select_rows(" WHERE alias = ?1;", Some(alias))
            .map(|found| found.into_iter().next());
        log_list_outcome(
            "typed_alias",
            started_at,
            result.as_ref().map(|found| usize::from(found.is_some())),
        );
        result
    }
}

fn log_list_outcome(mode: &str, started_at: Instant, rows: Result<usize, &RepoError>) {
    match rows {
        Ok(rows) => debug!(
            "event=registration_list module=repo status=ok mode={mode} duration_ms={} rows={rows}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => log_failure(
            "registration_list",
            &format!(" mode={mode}"),
            started_at,
            err,
        ),
    }
}

fn log_failure(event: &str, extra: &str, started_at: Instant, err: &RepoError) {
    error!(
        "event={event} module=repo status=error{extra} duration_ms={} error_code={} error={}",
        started_at.elapsed().as_millis(),
        error_code(err),
        error_detail(err)
    );
}

fn error_code(err: &RepoError) -> &'static str {
    match err {
        RepoError::Validation(_) => "validation_failed",
        RepoError::PathResolution { .. } => "path_unresolved",
        RepoError::Db(DbError::Visitor { .. }) => "visitor_failed",
        RepoError::Db(_) => "db_failed",
        RepoError::InvalidData(_) => "invalid_data",
    }
}

/// Renders `err` without aliases, paths or visitor messages.
fn error_detail(err: &RepoError) -> String {
    match err {
        RepoError::Validation(RegistrationValidationError::InvalidAliasChar { .. }) => {
            "alias contains a rejected character".to_string()
        }
        RepoError::Validation(err) => err.to_string(),
        RepoError::PathResolution { source, .. } => source.to_string(),
        RepoError::Db(DbError::Visitor { row, column, .. }) => {
            format!("visitor rejected row {row} column `{column}`")
        }
        RepoError::Db(err) => err.to_string(),
        RepoError::InvalidData(message) => message.clone(),
    }
}

fn parse_registration_row(row: &Row<'_>) -> RepoResult<Registration> {
    let alias: String = row.get("alias")?;
    let path: String = row.get("path")?;
    if !Path::new(&path).is_absolute() {
        return Err(RepoError::InvalidData(format!(
            "non-absolute path stored for id {}",
            row.get::<_, i64>("id")?
        )));
    }

    Ok(Registration {
        id: RegistrationId(row.get("id")?),
        alias,
        path: PathBuf::from(path),
    })
}

/// Adds a registration on `conn`.
pub fn add(conn: &Connection, alias: &str, path: impl AsRef<Path>) -> RepoResult<RegistrationId> {
    SqliteRegistrationRepository::new(conn).add_registration(alias, path.as_ref())
}

/// Removes the registration named `alias` on `conn`.
pub fn remove(conn: &Connection, alias: &str) -> RepoResult<usize> {
    SqliteRegistrationRepository::new(conn).remove_registration(alias)
}

/// Visits every registration on `conn`, ordered by alias.
pub fn for_each<F>(conn: &Connection, visitor: F) -> RepoResult<usize>
where
    F: FnMut(&str, &str) -> VisitResult,
{
    SqliteRegistrationRepository::new(conn).for_each_registration(visitor)
}

/// Visits the path registered under `alias` on `conn`.
pub fn for_alias<F>(conn: &Connection, alias: &str, visitor: F) -> RepoResult<usize>
where
    F: FnMut(&str, &str) -> VisitResult,
{
    SqliteRegistrationRepository::new(conn).for_alias(alias, visitor)
}
