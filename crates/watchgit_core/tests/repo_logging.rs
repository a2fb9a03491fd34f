use rusqlite::Connection;
use std::fs;
use std::path::Path;
use watchgit_core::{
    add, for_alias, for_each, init_logging, open_registry_at, remove, RegistrationRepository,
    SqliteRegistrationRepository, VisitError,
};

const ALIAS: &str = "private-alias-7f3a";

fn read_logs(dir: &Path) -> String {
    log::logger().flush();
    let mut text = String::new();
    for entry in fs::read_dir(dir).unwrap() {
        text.push_str(&fs::read_to_string(entry.unwrap().path()).unwrap());
    }
    text
}

fn lines_with<'a>(logs: &'a str, needles: &[&str]) -> Vec<&'a str> {
    logs.lines()
        .filter(|line| needles.iter().all(|needle| line.contains(needle)))
        .collect()
}

// Logging is process-wide, so every scenario shares one test.
#[test]
fn registration_events_carry_status_duration_and_error_code() {
    let log_dir = tempfile::tempdir().unwrap();
    let registry_dir = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    init_logging("debug", log_dir.path().to_str().unwrap()).unwrap();

    let conn = open_registry_at(&registry_dir.path().join("watchgit.db")).unwrap();
    add(&conn, ALIAS, project.path()).unwrap();
    add(&conn, ALIAS, project.path()).unwrap_err();
    add(&conn, "bad alias", project.path()).unwrap_err();
    for_each(&conn, |_, _| Ok(())).unwrap();
    for_alias(&conn, ALIAS, |_, value| Err(VisitError::new(format!("rejected {value}"))))
        .unwrap_err();
    let repo = SqliteRegistrationRepository::new(&conn);
    assert_eq!(repo.list_registrations().unwrap().len(), 1);
    assert!(repo.find_by_alias(ALIAS).unwrap().is_some());
    assert_eq!(remove(&conn, ALIAS).unwrap(), 1);

    let bare = Connection::open_in_memory().unwrap();
    remove(&bare, ALIAS).unwrap_err();

    let logs = read_logs(log_dir.path());

    for event in ["registration_add", "registration_remove", "registration_list"] {
        let event = format!("event={event} module=repo");
        assert!(!lines_with(&logs, &[&event, "status=start"]).is_empty(), "{event}");
        for line in lines_with(&logs, &[&event, "status=ok"]) {
            assert!(line.contains("duration_ms="), "{line}");
        }
        let failures = lines_with(&logs, &[&event, "status=error"]);
        assert!(!failures.is_empty(), "{event}");
        for line in failures {
            assert!(line.contains("duration_ms="), "{line}");
            assert!(line.contains("error_code="), "{line}");
        }
    }

    for expected in [
        &["event=registration_add", "error_code=validation_failed"][..],
        &["event=registration_add", "error_code=db_failed"],
        &["event=registration_list", "mode=alias", "error_code=visitor_failed"],
        &["event=registration_remove", "error_code=db_failed"],
        &["mode=typed_alias", "status=ok", "rows=1"],
    ] {
        assert!(!lines_with(&logs, expected).is_empty(), "{expected:?}");
    }

    assert!(!logs.contains(ALIAS), "aliases are user data");
    assert!(!logs.contains("bad alias"));
    let project_text = fs::canonicalize(project.path()).unwrap();
    assert!(!logs.contains(project_text.to_str().unwrap()), "paths are user data");
}
