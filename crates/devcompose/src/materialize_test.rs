// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::assemble::{Assembly, CompositionDocument};
use crate::node::Node;

fn context(target: &Path) -> ModificationContext {
    let production: Node = serde_yaml::from_str("services:\n  php:\n    image: php:8.1\n").unwrap();
    let dev_tools: Node =
        serde_yaml::from_str("services:\n  php:\n    image: php:8.1-dev\n  pma:\n    image: pma\n")
            .unwrap();
    let assembly = Assembly {
        production: CompositionDocument::new(DocumentKind::Production, production),
        dev_tools: CompositionDocument::new(DocumentKind::DevTools, dev_tools),
    };
    let mut ctx = ModificationContext::new(assembly, target, target)
        .with_domains(vec!["shop.local".to_string()]);
    ctx.readme.set_section(40, "Hosts", "127.0.0.1 shop.local\n");
    ctx.readme.set_section(0, "Overview", "Template `php_mysql`.\n");
    ctx
}

#[rstest]
fn test_writes_all_outputs() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("nested").join("shop.local");
    let ctx = context(&target);

    let materialized = Materializer::new(&target).materialize(&ctx).unwrap();

    let names: Vec<&str> = materialized.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["docker-compose.yaml", "docker-compose-dev-tools.yaml", "README.md"]
    );
    for file in &materialized.files {
        assert_eq!(std::fs::read_to_string(&file.path).unwrap(), file.content);
    }

    let production = std::fs::read_to_string(target.join("docker-compose.yaml")).unwrap();
    let parsed: Node = serde_yaml::from_str(&production).unwrap();
    assert_eq!(&parsed, ctx.production.root());
}

#[rstest]
fn test_readme_layout() {
    let tmp = TempDir::new().unwrap();
    let rendered = Materializer::render(&context(tmp.path())).unwrap();
    let (_, readme) = rendered.last().unwrap();
    assert_eq!(
        readme,
        "# shop.local\n\n## Overview\n\nTemplate `php_mysql`.\n\n## Hosts\n\n127.0.0.1 shop.local\n"
    );
}

#[rstest]
fn test_overwrites_previous_outputs() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("docker-compose.yaml"), "stale: true\n").unwrap();

    let ctx = context(tmp.path());
    Materializer::new(tmp.path()).materialize(&ctx).unwrap();
    let first = std::fs::read_to_string(tmp.path().join("docker-compose.yaml")).unwrap();
    assert!(!first.contains("stale"));

    Materializer::new(tmp.path()).materialize(&ctx).unwrap();
    let second = std::fs::read_to_string(tmp.path().join("docker-compose.yaml")).unwrap();
    assert_eq!(first, second);

    let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[rstest]
fn test_unwritable_target_fails() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("blocker");
    std::fs::write(&blocker, "file").unwrap();

    let err = Materializer::new(blocker.join("target"))
        .materialize(&context(tmp.path()))
        .unwrap_err();
    assert!(matches!(err, Error::MaterializationFailed { .. }));
}

#[rstest]
fn test_writes_staged_files() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("target");
    let certs = tmp.path().join("shared").join("certs").join("certificates.yaml");
    let mut ctx = context(&target);
    ctx.stage_file(&certs, "tls:\n  certificates: []\n");

    let materialized = Materializer::new(&target).materialize(&ctx).unwrap();

    assert_eq!(materialized.staged, vec![certs.clone()]);
    assert_eq!(materialized.files.len(), 3);
    assert_eq!(
        std::fs::read_to_string(&certs).unwrap(),
        "tls:\n  certificates: []\n"
    );
}
