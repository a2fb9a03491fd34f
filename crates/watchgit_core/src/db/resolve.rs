//! Registry location resolver.
//!
//! # Responsibility
//! - Expand `~`, `~/...`, `$NAME` and `${NAME}` in a configured location.
//! - Produce exactly one absolute path, or refuse.
//!
//! # Invariants
//! - Anything a shell would split or glob into several words is rejected.
//! - Unset variables are errors, never silently empty.

use super::{DbError, DbResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::env::VarError;
use std::path::PathBuf;

static ENV_REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("valid env reference regex")
});

const GLOB_CHARS: &[char] = &['*', '?', '['];
const UNSUPPORTED_CHARS: &[char] = &['$', '`', '\'', '"', '\\'];

/// Resolves a configured registry location to one absolute path.
///
/// Relative results are anchored at the current working directory.
///
/// # Errors
/// - `DbError::Resolution` when the location is empty, ambiguous, refers to
///   an unset variable or an unknown home directory.
pub fn resolve_location(location: &str) -> DbResult<PathBuf> {
    expand_location(location, |name| std::env::var(name), dirs::home_dir).map_err(
        |reason| DbError::Resolution {
            location: location.to_string(),
            reason,
        },
    )
}

fn expand_location(
    location: &str,
    lookup_var: impl Fn(&str) -> Result<String, VarError>,
    home_dir: impl FnOnce() -> Option<PathBuf>,
) -> Result<PathBuf, String> {
    if location.is_empty() {
        return Err("location is empty".to_string());
    }

    let (mut expanded, rest) = match location.strip_prefix('~') {
        Some(after) if after.is_empty() || after.starts_with('/') => {
            let home = home_dir().ok_or_else(|| "home directory is unknown".to_string())?;
            let home = home
                .into_os_string()
                .into_string()
                .map_err(|_| "home directory is not valid UTF-8".to_string())?;
            (home, after)
        }
        Some(_) => return Err("`~user` expansion is not supported".to_string()),
        None => (String::new(), location),
    };

    let mut cursor = 0;
    for captures in ENV_REFERENCE_RE.captures_iter(rest) {
        let Some(reference) = captures.get(0) else {
            continue;
        };
        push_literal(&mut expanded, &rest[cursor..reference.start()])?;

        let name = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map_or("", |name| name.as_str());
        let value = lookup_var(name).map_err(|err| match err {
            VarError::NotPresent => format!("environment variable `{name}` is not set"),
            VarError::NotUnicode(_) => {
                format!("environment variable `{name}` is not valid UTF-8")
            }
        })?;
        ensure_single_word(&value)?;
        expanded.push_str(&value);

        cursor = reference.end();
    }
    push_literal(&mut expanded, &rest[cursor..])?;

    if expanded.is_empty() {
        return Err("location expands to nothing".to_string());
    }

    let path = PathBuf::from(expanded);
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir()
        .map_err(|err| format!("cannot determine current directory: {err}"))?;
    Ok(cwd.join(path))
}

fn push_literal(expanded: &mut String, literal: &str) -> Result<(), String> {
    if literal.contains(UNSUPPORTED_CHARS) {
        return Err("shell quoting and substitution are not supported".to_string());
    }
    ensure_single_word(literal)?;
    expanded.push_str(literal);
    Ok(())
}

fn ensure_single_word(text: &str) -> Result<(), String> {
    if text.contains(char::is_whitespace) {
        return Err("location expands to more than one word".to_string());
    }
    if text.contains(GLOB_CHARS) {
        return Err("location contains glob characters".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{expand_location, resolve_location};
    use crate::db::DbError;
    use std::env::VarError;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn vars(name: &str) -> Result<String, VarError> {
        match name {
            "DATA" => Ok("/srv/data".to_string()),
            "SPACED" => Ok("/srv/my data".to_string()),
            "EMPTY" => Ok(String::new()),
            "GARBLED" => Err(VarError::NotUnicode(OsString::from("x"))),
            _ => Err(VarError::NotPresent),
        }
    }

    fn home() -> Option<PathBuf> {
        Some(PathBuf::from("/home/tester"))
    }

    #[test]
    fn expands_home_shortcut() {
        assert_eq!(
            expand_location("~/.watchgit.db", vars, home).unwrap(),
            PathBuf::from("/home/tester/.watchgit.db")
        );
        assert_eq!(
            expand_location("~", vars, home).unwrap(),
            PathBuf::from("/home/tester")
        );
    }

    #[test]
    fn expands_both_variable_forms() {
        assert_eq!(
            expand_location("$DATA/reg.db", vars, home).unwrap(),
            PathBuf::from("/srv/data/reg.db")
        );
        assert_eq!(
            expand_location("${DATA}x/reg.db", vars, home).unwrap(),
            PathBuf::from("/srv/datax/reg.db")
        );
    }

    #[test]
    fn relative_result_is_anchored_at_cwd() {
        let resolved = expand_location("reg.db", vars, home).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("reg.db"));
    }

    #[test]
    fn rejects_zero_or_many_words() {
        assert!(expand_location("", vars, home).is_err());
        assert!(expand_location("$EMPTY", vars, home)
            .unwrap_err()
            .contains("nothing"));
        assert!(expand_location("/tmp/a b.db", vars, home)
            .unwrap_err()
            .contains("more than one word"));
        assert!(expand_location("$SPACED/reg.db", vars, home).is_err());
        assert!(expand_location("/tmp/*.db", vars, home)
            .unwrap_err()
            .contains("glob"));
    }

    #[test]
    fn rejects_unresolvable_references() {
        assert!(expand_location("$MISSING/reg.db", vars, home)
            .unwrap_err()
            .contains("MISSING"));
        assert!(expand_location("~/reg.db", vars, || None)
            .unwrap_err()
            .contains("home"));
        assert!(expand_location("~other/reg.db", vars, home).is_err());
        assert!(expand_location("$(whoami)/reg.db", vars, home).is_err());
    }

    #[test]
    fn public_entry_point_reports_location() {
        let err = resolve_location("/tmp/a b.db").unwrap_err();
        match err {
            DbError::Resolution { location, .. } => assert_eq!(location, "/tmp/a b.db"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_unicode_variable_is_not_reported_as_unset() {
        let reason = expand_location("$GARBLED/reg.db", vars, home).unwrap_err();
        assert!(reason.contains("not valid UTF-8"), "{reason}");
        assert!(!reason.contains("not set"));
    }

    #[cfg(unix)]
    #[test]
    fn non_unicode_home_is_rejected() {
        use std::os::unix::ffi::OsStringExt;

        let garbled_home = || Some(PathBuf::from(OsString::from_vec(b"/home/\xff".to_vec())));
        let reason = expand_location("~/reg.db", vars, garbled_home).unwrap_err();
        assert!(reason.contains("home directory is not valid UTF-8"), "{reason}");
    }
}
