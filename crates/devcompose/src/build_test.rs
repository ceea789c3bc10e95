// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::fixtures;
use crate::manifest::verify_manifest;
use crate::node::Node;
use crate::resolve::{HeadlessResolver, PresetResolver};
use crate::selection::HeadlessSelector;
use crate::{Error, MANIFEST_FILENAME};

fn config(tmp: &Path) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.hosts.file = tmp.join("hosts");
    config
}

fn request(root: &Path) -> BuildRequest {
    BuildRequest {
        template: "php_mysql".to_string(),
        required: vec!["database=mariadb_10_4_persistent".to_string()],
        optional: vec!["dbadmin=phpmyadmin_5".to_string()],
        domains: vec!["shop.local".to_string(), "www.shop.local".to_string()],
        project_root: root.to_path_buf(),
        ..Default::default()
    }
}

fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap()
}

fn env_value(doc: &Node, service: &str, key: &str) -> String {
    doc.get("services")
        .and_then(|s| s.get(service))
        .and_then(|s| s.get("environment"))
        .and_then(|e| e.get(key))
        .and_then(Node::as_str)
        .unwrap()
        .to_string()
}

#[rstest]
fn test_build_writes_outputs() {
    let tmp = TempDir::new().unwrap();
    let registry = fixtures::registry();
    let config = config(tmp.path());
    let builder = CompositionBuilder::new(&registry, &config);

    let output = builder
        .build(&request(tmp.path()), &mut HeadlessSelector, &mut HeadlessResolver)
        .unwrap();

    let target = tmp.path().join(".devcompose").join("shop.local");
    assert_eq!(output.target_dir, target);
    for name in [
        "docker-compose.yaml",
        "docker-compose-dev-tools.yaml",
        "README.md",
        MANIFEST_FILENAME,
    ] {
        assert!(target.join(name).is_file(), "{name} missing");
    }
    assert_eq!(output.manifest_path, target.join(MANIFEST_FILENAME));
    assert!(verify_manifest(&target).unwrap().is_empty());

    let production: Node = serde_yaml::from_str(&read(&target, "docker-compose.yaml")).unwrap();
    let services: Vec<&str> = production
        .get("services")
        .and_then(Node::as_map)
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(services, vec!["php", "mariadb"]);

    let php = production.get("services").and_then(|s| s.get("php")).unwrap();
    let volumes: Vec<&str> = php
        .get("volumes")
        .and_then(Node::as_list)
        .unwrap()
        .iter()
        .filter_map(Node::as_str)
        .collect();
    assert_eq!(volumes, vec!["../..:/var/www/html"]);

    let labels: Vec<&str> = php
        .get("labels")
        .and_then(Node::as_list)
        .unwrap()
        .iter()
        .filter_map(Node::as_str)
        .collect();
    assert!(labels.contains(
        &"traefik.http.routers.shop-local-http.rule=Host(`shop.local`) || Host(`www.shop.local`)"
    ));
    assert!(labels.contains(&"traefik.http.routers.shop-local-http-secure.tls=true"));

    let readme = read(&target, "README.md");
    assert!(readme.starts_with("# shop.local\n"));
    assert!(readme.contains("## Overview"));
    assert!(readme.contains("- `database=mariadb_10_4_persistent` (required)"));
    assert!(readme.contains("## Hosts"));
    assert!(readme.contains("## Certificates"));
    assert!(target.join("certificates").join("certificates.yaml").is_file());
}

#[rstest]
fn test_shared_secret_resolved_once() {
    let tmp = TempDir::new().unwrap();
    let registry = fixtures::registry();
    let config = config(tmp.path());
    let output = CompositionBuilder::new(&registry, &config)
        .build(&request(tmp.path()), &mut HeadlessSelector, &mut HeadlessResolver)
        .unwrap();

    let dev: Node =
        serde_yaml::from_str(&read(&output.target_dir, "docker-compose-dev-tools.yaml")).unwrap();
    let mariadb = env_value(&dev, "mariadb", "MYSQL_ROOT_PASSWORD");
    let pma = env_value(&dev, "phpmyadmin", "MYSQL_ROOT_PASSWORD");
    assert_eq!(mariadb.len(), crate::resolve::SECRET_LENGTH);
    assert_eq!(mariadb, pma);
    assert_eq!(output.parameters.value("db_root_password"), Some(mariadb.as_str()));

    let production: Node =
        serde_yaml::from_str(&read(&output.target_dir, "docker-compose.yaml")).unwrap();
    assert!(production
        .get("services")
        .and_then(|s| s.get("phpmyadmin"))
        .is_none());
}

#[rstest]
fn test_rebuild_is_stable() {
    let tmp = TempDir::new().unwrap();
    let registry = fixtures::registry();
    let config = config(tmp.path());
    let builder = CompositionBuilder::new(&registry, &config);
    let request = request(tmp.path());

    let first = builder
        .build(&request, &mut HeadlessSelector, &mut HeadlessResolver)
        .unwrap();
    let outputs: Vec<String> = first.materialized.files.iter().map(|f| f.content.clone()).collect();
    let certificates = read(&first.target_dir.join("certificates"), "certificates.yaml");

    let second = builder
        .build(&request, &mut HeadlessSelector, &mut HeadlessResolver)
        .unwrap();
    let again: Vec<String> = second.materialized.files.iter().map(|f| f.content.clone()).collect();

    assert_eq!(outputs, again);
    assert_eq!(first.manifest.parameters, second.manifest.parameters);
    assert_eq!(
        read(&second.target_dir.join("certificates"), "certificates.yaml"),
        certificates
    );
}

#[rstest]
fn test_fresh_build_regenerates_secrets() {
    let tmp = TempDir::new().unwrap();
    let registry = fixtures::registry();
    let config = config(tmp.path());
    let builder = CompositionBuilder::new(&registry, &config);
    let mut request = request(tmp.path());

    let first = builder
        .build(&request, &mut HeadlessSelector, &mut HeadlessResolver)
        .unwrap();
    request.fresh = true;
    let second = builder
        .build(&request, &mut HeadlessSelector, &mut HeadlessResolver)
        .unwrap();
    assert_ne!(
        first.parameters.value("db_root_password"),
        second.parameters.value("db_root_password")
    );
    assert_eq!(first.parameters.value("db_name"), Some("app"));
}

#[rstest]
fn test_explicit_credentials_are_escaped() {
    let tmp = TempDir::new().unwrap();
    let registry = fixtures::registry();
    let config = config(tmp.path());
    let mut request = request(tmp.path());
    request
        .parameters
        .insert("db_root_password".to_string(), "pa$$word".to_string());

    let builder = CompositionBuilder::new(&registry, &config);
    for _ in 0..2 {
        let output = builder
            .build(&request, &mut HeadlessSelector, &mut HeadlessResolver)
            .unwrap();
        let production: Node =
            serde_yaml::from_str(&read(&output.target_dir, "docker-compose.yaml")).unwrap();
        assert_eq!(env_value(&production, "mariadb", "MYSQL_ROOT_PASSWORD"), "pa$$$$word");
        assert_eq!(output.manifest.parameters["db_root_password"], "pa$$word");
    }
}

#[rstest]
fn test_prompted_selection_and_parameters() {
    let tmp = TempDir::new().unwrap();
    let registry = fixtures::registry();
    let config = config(tmp.path());
    let mut request = request(tmp.path());
    request.required.clear();
    request.optional.clear();

    let mut asked = Vec::new();
    let mut selector =
        |_: &Template, group: &crate::template::ServiceGroup| -> crate::Result<Option<String>> {
            asked.push(group.name.clone());
            Ok(Some("mysql_8_0_persistent".to_string()))
        };
    let mut resolver = PresetResolver::default();
    resolver.insert("db_password", "from-prompt");

    let prepared = CompositionBuilder::new(&registry, &config)
        .prepare(&request, &mut selector, &mut resolver)
        .unwrap();
    assert_eq!(asked, vec!["database"]);
    assert_eq!(prepared.parameters.value("db_password"), Some("from-prompt"));
    assert!(prepared.context.production.service("mysql").is_some());
    assert!(!prepared.target_dir.exists());
}

#[rstest]
fn test_missing_selection_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let registry = fixtures::registry();
    let config = config(tmp.path());
    let mut request = request(tmp.path());
    request.required.clear();

    let err = CompositionBuilder::new(&registry, &config)
        .build(&request, &mut HeadlessSelector, &mut HeadlessResolver)
        .unwrap_err();
    assert!(matches!(err, Error::MissingSelection { .. }));
    assert!(!tmp.path().join(".devcompose").exists());
}

#[rstest]
#[case("../../escaped")]
#[case("shop`.local")]
#[case("shop local")]
fn test_invalid_domain_rejected_before_writing(#[case] domain: &str) {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("project");
    std::fs::create_dir(&project).unwrap();
    let registry = fixtures::registry();
    let config = config(tmp.path());
    let mut request = request(&project);
    request.domains = vec![domain.to_string()];

    let err = CompositionBuilder::new(&registry, &config)
        .build(&request, &mut HeadlessSelector, &mut HeadlessResolver)
        .unwrap_err();
    assert!(matches!(err, Error::ValidationFailed(_)));
    assert!(!project.join(".devcompose").exists());
    assert!(!tmp.path().join("escaped").exists());
}

#[rstest]
fn test_unknown_template() {
    let tmp = TempDir::new().unwrap();
    let registry = fixtures::registry();
    let config = config(tmp.path());
    let mut request = request(tmp.path());
    request.template = "php_mysq".to_string();

    let err = CompositionBuilder::new(&registry, &config)
        .build(&request, &mut HeadlessSelector, &mut HeadlessResolver)
        .unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound { .. }));
}

#[rstest]
fn test_missing_domain_parameter() {
    let tmp = TempDir::new().unwrap();
    let registry = fixtures::registry();
    let config = config(tmp.path());
    let mut request = request(tmp.path());
    request.domains.clear();

    let err = CompositionBuilder::new(&registry, &config)
        .build(&request, &mut HeadlessSelector, &mut HeadlessResolver)
        .unwrap_err();
    match err {
        Error::MissingParameter { name, .. } => assert_eq!(name, "main_domain"),
        other => panic!("expected MissingParameter, got {other:?}"),
    }
}

#[rstest]
#[case(None, &["shop.local"], "/project/.devcompose/shop.local")]
#[case(None, &[], "/project/.devcompose/php_mysql")]
#[case(Some("out"), &["shop.local"], "/project/out")]
#[case(Some("/srv/compose"), &["shop.local"], "/srv/compose")]
fn test_target_dir(#[case] target: Option<&str>, #[case] domains: &[&str], #[case] expected: &str) {
    let registry = TemplateRegistry::default();
    let config = EngineConfig::default();
    let request = BuildRequest {
        template: "php_mysql".to_string(),
        project_root: PathBuf::from("/project"),
        target_dir: target.map(PathBuf::from),
        ..Default::default()
    };
    let domains: Vec<String> = domains.iter().map(|d| d.to_string()).collect();
    assert_eq!(
        CompositionBuilder::new(&registry, &config).target_dir(&request, &domains),
        PathBuf::from(expected)
    );
}
