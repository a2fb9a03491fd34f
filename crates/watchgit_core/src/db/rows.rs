//! Row visitor protocol.
//!
//! # Responsibility
//! - Run one bound statement and hand every `(column, value)` pair to a
//!   caller-supplied visitor, without exposing `rusqlite` row types.
//!
//! # Invariants
//! - Every column of a row is visited, even after one of them failed.
//! - Iteration stops after the first row with a failed column; the error
//!   names the first failing column of that row.

use super::{DbError, DbResult};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Params};
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Outcome of one visitor call.
pub type VisitResult = Result<(), VisitError>;

/// Recoverable per-column failure raised by a visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitError {
    message: String,
}

impl VisitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for VisitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for VisitError {}

/// Executes `sql` with bound `params` and visits each column of each row.
///
/// Values are rendered as text: integers and reals are formatted, `NULL`
/// becomes an empty string and non-UTF-8 bytes are decoded lossily.
///
/// Returns the number of rows delivered.
///
/// # Errors
/// - `DbError::Sqlite` when preparing or stepping the statement fails.
/// - `DbError::Visitor` when the visitor rejected at least one column.
pub fn visit_rows<P, F>(conn: &Connection, sql: &str, params: P, mut visitor: F) -> DbResult<usize>
where
    P: Params,
    F: FnMut(&str, &str) -> VisitResult,
{
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = stmt.query(params)?;
    let mut delivered = 0;

    while let Some(row) = rows.next()? {
        let mut first_failure: Option<(usize, VisitError)> = None;

        for (index, column) in columns.iter().enumerate() {
            let value = column_text(row.get_ref(index)?);
            if let Err(err) = visitor(column.as_str(), &*value) {
                if first_failure.is_none() {
                    first_failure = Some((index, err));
                }
            }
        }

        if let Some((index, source)) = first_failure {
            return Err(DbError::Visitor {
                row: delivered,
                column: columns[index].clone(),
                source,
            });
        }
        delivered += 1;
    }

    Ok(delivered)
}

fn column_text(value: ValueRef<'_>) -> Cow<'_, str> {
    match value {
        ValueRef::Null => Cow::Borrowed(""),
        ValueRef::Integer(number) => Cow::Owned(number.to_string()),
        ValueRef::Real(number) => Cow::Owned(number.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes),
    }
}
