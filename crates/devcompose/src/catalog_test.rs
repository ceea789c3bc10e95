// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use rstest::rstest;

use super::*;
use crate::fixtures::{definitions_dir, definitions_tree, write_file};

#[rstest]
fn test_variant_group_and_code_from_location() {
    let tmp = definitions_tree();
    let path = write_file(
        tmp.path(),
        "services/cache/redis_6_0.yaml",
        "compose:\n  services:\n    redis:\n      image: redis:6.0\n",
    );

    let variant = ServiceVariant::load(&path).unwrap();
    assert_eq!(variant.id.group, "cache");
    assert_eq!(variant.id.code, "redis_6_0");
    assert_eq!(variant.id.to_string(), "cache=redis_6_0");
    assert!(!variant.dev_only);
    assert!(variant.dev_tools.is_none());
}

#[rstest]
fn test_variant_placeholders_are_implicit_parameters() {
    let yaml = r#"
parameters:
  db_name: app
  db_port: 3306
compose:
  services:
    mysql:
      environment:
        MYSQL_DATABASE: "{{db_name}}"
        MYSQL_ROOT_PASSWORD: "{{ db_root_password }}"
dev_tools:
  services:
    mysql:
      ports:
        - "{{db_port}}:3306"
        - "{{debug_port}}:9000"
"#;
    let variant =
        ServiceVariant::from_yaml("database", "mysql", yaml, Path::new("mysql.yaml")).unwrap();

    assert_eq!(variant.parameters["db_name"].as_deref(), Some("app"));
    assert_eq!(variant.parameters["db_port"].as_deref(), Some("3306"));
    assert_eq!(variant.parameters["db_root_password"], None);
    assert_eq!(variant.parameters["debug_port"], None);
    assert_eq!(
        variant.parameter_names().collect::<Vec<_>>(),
        vec!["db_name", "db_port", "db_root_password", "debug_port"]
    );
}

#[rstest]
#[case::list_compose("compose:\n  - a\n")]
#[case::list_dev_tools("dev_tools: [a]\n")]
#[case::compound_default("parameters:\n  x: [1, 2]\n")]
fn test_variant_rejects_malformed(#[case] yaml: &str) {
    let result = ServiceVariant::from_yaml("g", "c", yaml, Path::new("c.yaml"));
    assert!(matches!(result, Err(Error::InvalidDefinition { .. })));
}

#[rstest]
fn test_variant_rejects_unknown_fields() {
    let result = ServiceVariant::from_yaml("g", "c", "image: nginx\n", Path::new("c.yaml"));
    assert!(matches!(result, Err(Error::InvalidYaml { .. })));
}

#[rstest]
fn test_variant_rejects_unknown_api() {
    let result = ServiceVariant::from_yaml("g", "c", "api: devcompose/v9\n", Path::new("c.yaml"));
    assert!(matches!(result, Err(Error::InvalidYaml { .. })));
}

#[rstest]
fn test_catalog_rejects_duplicate_codes() {
    let mut catalog = ServiceCatalog::new();
    let first = ServiceVariant::from_yaml("cache", "redis", "{}", Path::new("a.yaml")).unwrap();
    let second = ServiceVariant::from_yaml("cache", "redis", "{}", Path::new("b.yaml")).unwrap();

    catalog.insert(first).unwrap();
    let err = catalog.insert(second).unwrap_err();
    assert!(matches!(err, Error::InvalidDefinition { .. }));
}

#[rstest]
fn test_catalog_same_code_in_other_group() {
    let mut catalog = ServiceCatalog::new();
    catalog
        .insert(ServiceVariant::from_yaml("cache", "redis", "{}", Path::new("a.yaml")).unwrap())
        .unwrap();
    catalog
        .insert(ServiceVariant::from_yaml("queue", "redis", "{}", Path::new("b.yaml")).unwrap())
        .unwrap();

    assert!(catalog.get("cache", "redis").is_some());
    assert!(catalog.get("queue", "redis").is_some());
    assert!(catalog.get("search", "redis").is_none());
}

#[rstest]
fn test_catalog_load_ignores_non_yaml() {
    let tmp = definitions_tree();
    write_file(tmp.path(), "services/cache/redis_6_0.yml", "{}\n");
    write_file(tmp.path(), "services/cache/README.md", "# caches\n");
    write_file(tmp.path(), "services/stray.yaml", "{}\n");

    let catalog = ServiceCatalog::load(tmp.path().join("services")).unwrap();
    assert_eq!(catalog.group_names().collect::<Vec<_>>(), vec!["cache"]);
    assert_eq!(catalog.variants().count(), 1);
}

#[rstest]
fn test_catalog_load_missing_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let result = ServiceCatalog::load(tmp.path().join("nope"));
    assert!(matches!(result, Err(Error::ReadFailed { .. })));
}

#[rstest]
fn test_sample_catalog() {
    let catalog = ServiceCatalog::load(definitions_dir().join("services")).unwrap();

    let groups: Vec<&str> = catalog.group_names().collect();
    assert_eq!(groups, vec!["cache", "database", "dbadmin", "php", "search"]);

    let pma = catalog.get("dbadmin", "phpmyadmin_5").unwrap();
    assert!(pma.dev_only);

    let php = catalog.get("php", "php_8_1_apache").unwrap();
    assert!(php.dev_tools.is_some());
    assert_eq!(php.parameters["php_version"].as_deref(), Some("8.1"));
    assert!(php.parameters.contains_key("traefik_rule"));
}
