use watchgit_core::{
    add, close_registry, for_alias, for_each, open_registry, open_registry_at, remove,
    Registration, RegistrationRepository, RegistryConfig, SqliteRegistrationRepository,
};

#[test]
fn free_functions_cover_the_registry_lifecycle() {
    let registry_dir = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let config = RegistryConfig::new(registry_dir.path().join("reg.db").to_str().unwrap());

    let conn = open_registry(&config).unwrap();
    let id = add(&conn, "proj", project.path()).unwrap();
    assert!(id.0 > 0);

    let mut paths = Vec::new();
    for_alias(&conn, "proj", |_, value| {
        paths.push(value.to_string());
        Ok(())
    })
    .unwrap();
    assert_eq!(
        paths,
        vec![std::fs::canonicalize(project.path())
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()]
    );

    assert_eq!(remove(&conn, "proj").unwrap(), 1);
    assert_eq!(for_each(&conn, |_, _| Ok(())).unwrap(), 0);
    close_registry(conn).unwrap();
}

#[test]
fn registration_serializes_with_plain_fields() {
    let registry_dir = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let conn = open_registry_at(&registry_dir.path().join("reg.db")).unwrap();
    add(&conn, "proj", project.path()).unwrap();

    let repo = SqliteRegistrationRepository::new(&conn);
    let registration = repo.find_by_alias("proj").unwrap().unwrap();

    let json = serde_json::to_value(&registration).unwrap();
    assert_eq!(json["alias"], "proj");
    assert!(json["id"].is_i64());
    assert_eq!(
        json["path"],
        std::fs::canonicalize(project.path())
            .unwrap()
            .to_str()
            .unwrap()
    );

    let decoded: Registration = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, registration);
}
