// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::materialize::MaterializedFile;

fn materialized(dir: &Path) -> Materialized {
    let files = [
        ("docker-compose.yaml", "services: {}\n"),
        ("README.md", "# shop.local\n"),
    ]
    .into_iter()
    .map(|(name, content)| {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        MaterializedFile {
            name: name.to_string(),
            path,
            content: content.to_string(),
        }
    })
    .collect();
    Materialized {
        target_dir: dir.to_path_buf(),
        files,
        staged: Vec::new(),
    }
}

fn manifest(dir: &Path) -> BuildManifest {
    let mut manifest = BuildManifest::new("php_mysql");
    manifest.services = vec!["php=php_8_1_apache".to_string()];
    manifest.domains = vec!["shop.local".to_string()];
    manifest
        .parameters
        .insert("db_root_password".to_string(), "s3cret".to_string());
    manifest.record_outputs(&materialized(dir));
    manifest
}

#[rstest]
fn test_sha256_hex() {
    assert_eq!(
        sha256_hex(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[rstest]
fn test_outputs_recorded() {
    let tmp = TempDir::new().unwrap();
    let manifest = manifest(tmp.path());
    assert_eq!(manifest.api, ManifestApiVersion::V0);
    assert_eq!(manifest.generated.version, env!("CARGO_PKG_VERSION"));
    let files: Vec<&str> = manifest.outputs.iter().map(|o| o.file.as_str()).collect();
    assert_eq!(files, vec!["docker-compose.yaml", "README.md"]);
    assert_eq!(manifest.outputs[1].sha256, sha256_hex(b"# shop.local\n"));
}

#[rstest]
fn test_save_and_load() {
    let tmp = TempDir::new().unwrap();
    assert!(BuildManifest::load(tmp.path()).unwrap().is_none());

    let manifest = manifest(tmp.path());
    let path = manifest.save(tmp.path()).unwrap();
    assert_eq!(path, tmp.path().join(MANIFEST_FILENAME));

    let loaded = BuildManifest::load(tmp.path()).unwrap().unwrap();
    assert_eq!(loaded, manifest);
    assert!(std::fs::read_to_string(&path)
        .unwrap()
        .contains("api: devcompose/v0/manifest"));
}

#[rstest]
fn test_unknown_api_rejected() {
    let err = BuildManifest::from_yaml(
        "api: devcompose/v9/manifest\ngenerated:\n  timestamp: 2024-01-01T00:00:00Z\n  version: '0'\n  hostname: h\ntemplate: t\n",
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidYaml { .. }));
}

#[rstest]
fn test_verify_clean() {
    let tmp = TempDir::new().unwrap();
    manifest(tmp.path()).save(tmp.path()).unwrap();
    assert!(verify_manifest(tmp.path()).unwrap().is_empty());
}

#[rstest]
fn test_verify_reports_drift() {
    let tmp = TempDir::new().unwrap();
    let manifest = manifest(tmp.path());
    manifest.save(tmp.path()).unwrap();

    std::fs::write(tmp.path().join("docker-compose.yaml"), "services: {edited: {}}\n").unwrap();
    std::fs::remove_file(tmp.path().join("README.md")).unwrap();

    let changes = verify_manifest(tmp.path()).unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].kind, ManifestChangeKind::OutputChanged);
    assert_eq!(changes[0].file, "docker-compose.yaml");
    assert_eq!(changes[0].expected, manifest.outputs[0].sha256);
    assert!(changes[0].actual.is_some());
    assert_eq!(changes[1].kind, ManifestChangeKind::OutputMissing);
    assert_eq!(changes[1].actual, None);
}

#[rstest]
fn test_verify_without_manifest() {
    let tmp = TempDir::new().unwrap();
    let err = verify_manifest(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::ValidationFailed(_)));
}
