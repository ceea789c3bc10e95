// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;
use crate::fixtures::registry;
use crate::template::TemplateRegistry;

fn choice(s: &str) -> ServiceChoice {
    s.parse().unwrap()
}

#[rstest]
#[case("database=mysql_8_0", Some("database"), Some("mysql_8_0"))]
#[case(" cache= ", Some("cache"), None)]
#[case("redis_6_0", None, Some("redis_6_0"))]
fn test_parse_choice(#[case] input: &str, #[case] group: Option<&str>, #[case] code: Option<&str>) {
    let parsed = choice(input);
    assert_eq!(parsed.group.as_deref(), group);
    assert_eq!(parsed.code.as_deref(), code);
}

#[rstest]
#[case("")]
#[case("=redis_6_0")]
fn test_parse_choice_invalid(#[case] input: &str) {
    assert!(input.parse::<ServiceChoice>().is_err());
}

#[rstest]
fn test_parse_choices_splits_on_space_and_comma() {
    let parsed = parse_choices(&["database=mysql_8_0, cache=redis_6_0", "php_8_1_apache"]).unwrap();
    let rendered: Vec<String> = parsed.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec!["database=mysql_8_0", "cache=redis_6_0", "php_8_1_apache"]
    );
}

#[rstest]
fn test_single_variant_required_group_is_auto_selected() {
    let registry = registry();
    let template = registry.by_code("php_mysql").unwrap();
    let selector = Selector::new(template);

    let missing: Vec<&str> = selector
        .missing_required()
        .iter()
        .map(|g| g.name.as_str())
        .collect();
    assert_eq!(missing, vec!["database"]);
}

#[rstest]
fn test_missing_required_blocks_finish() {
    let registry = registry();
    let template = registry.by_code("php_mysql").unwrap();
    let err = Selector::new(template).finish().unwrap_err();
    match err {
        Error::MissingSelection { template, groups } => {
            assert_eq!(template, "php_mysql");
            assert_eq!(groups, vec!["database"]);
        }
        other => panic!("expected MissingSelection, got {other:?}"),
    }
}

#[rstest]
fn test_selection_in_template_order() {
    let registry = registry();
    let template = registry.by_code("php_mysql").unwrap();
    let mut selector = Selector::new(template);
    selector
        .select_all(&[choice("cache=redis_6_0"), choice("mariadb_10_4_persistent")])
        .unwrap();
    let selection = selector.finish().unwrap();

    let ids: Vec<String> = selection.ids().iter().map(ToString::to_string).collect();
    assert_eq!(
        ids,
        vec![
            "php=php_8_1_apache",
            "database=mariadb_10_4_persistent",
            "cache=redis_6_0"
        ]
    );
    assert_eq!(selection.get("cache").unwrap().kind, ServiceKind::Optional);
    assert!(selection.get("dbadmin").is_none());
}

#[rstest]
fn test_optional_groups_default_to_none() {
    let registry = registry();
    let template = registry.by_code("php_mysql").unwrap();
    let mut selector = Selector::new(template);
    selector.choose("database", "mysql_8_0_persistent").unwrap();
    selector.select(&ServiceChoice::none("cache")).unwrap();
    let selection = selector.finish().unwrap();

    assert!(selection.get("cache").is_none());
    assert!(selection.get("dbadmin").is_none());
    assert_eq!(selection.variants().len(), 2);
}

#[rstest]
fn test_unknown_group_rejected() {
    let registry = registry();
    let template = registry.by_code("php_mysql").unwrap();
    let err = Selector::new(template)
        .select(&choice("search=elasticsearch_7_16"))
        .unwrap_err();
    match err {
        Error::UnknownGroup { group, available, .. } => {
            assert_eq!(group, "search");
            assert_eq!(available, vec!["php", "database", "cache", "dbadmin"]);
        }
        other => panic!("expected UnknownGroup, got {other:?}"),
    }
}

#[rstest]
fn test_unknown_optional_variant_rejected() {
    let registry = registry();
    let template = registry.by_code("php_mysql").unwrap();
    let err = Selector::new(template)
        .select(&choice("cache=memcached"))
        .unwrap_err();
    match err {
        Error::UnknownVariant { group, code, available } => {
            assert_eq!(group, "cache");
            assert_eq!(code, "memcached");
            assert_eq!(available, vec!["redis_6_0"]);
        }
        other => panic!("expected UnknownVariant, got {other:?}"),
    }
}

#[rstest]
fn test_unknown_bare_code_rejected() {
    let registry = registry();
    let template = registry.by_code("php_mysql").unwrap();
    let err = Selector::new(template).select(&choice("memcached")).unwrap_err();
    assert!(matches!(err, Error::UnknownVariant { .. }));
}

#[rstest]
fn test_required_group_cannot_be_emptied() {
    let registry = registry();
    let template = registry.by_code("php_mysql").unwrap();
    let err = Selector::new(template).select(&choice("database=")).unwrap_err();
    assert!(matches!(err, Error::ValidationFailed(_)));
}

#[rstest]
fn test_conflicting_selection_rejected() {
    let registry = registry();
    let template = registry.by_code("php_mysql").unwrap();
    let mut selector = Selector::new(template);
    selector.choose("database", "mysql_8_0_persistent").unwrap();
    // Repeating the same choice is fine.
    selector.choose("database", "mysql_8_0_persistent").unwrap();

    let err = selector
        .choose("database", "mariadb_10_4_persistent")
        .unwrap_err();
    match err {
        Error::DuplicateSelection {
            group,
            existing,
            requested,
        } => {
            assert_eq!(group, "database");
            assert_eq!(existing, "mysql_8_0_persistent");
            assert_eq!(requested, "mariadb_10_4_persistent");
        }
        other => panic!("expected DuplicateSelection, got {other:?}"),
    }
}

#[rstest]
fn test_ambiguous_bare_code() {
    let tmp = crate::fixtures::definitions_tree();
    crate::fixtures::write_file(tmp.path(), "services/cache/redis.yaml", "{}\n");
    crate::fixtures::write_file(tmp.path(), "services/queue/redis.yaml", "{}\n");
    crate::fixtures::write_file(
        tmp.path(),
        "templates/t.yaml",
        "services:\n  optional:\n    cache: [redis]\n    queue: [redis]\n",
    );
    let registry = TemplateRegistry::load(tmp.path()).unwrap();
    let template = registry.by_code("t").unwrap();

    let err = Selector::new(template).select(&choice("redis")).unwrap_err();
    match err {
        Error::AmbiguousVariant { code, groups } => {
            assert_eq!(code, "redis");
            assert_eq!(groups, vec!["cache", "queue"]);
        }
        other => panic!("expected AmbiguousVariant, got {other:?}"),
    }
}

#[rstest]
fn test_resolver_fills_missing_groups() {
    let registry = registry();
    let template = registry.by_code("magento_2_4").unwrap();
    let mut asked = Vec::new();
    let mut resolver = |_: &Template, group: &ServiceGroup| -> Result<Option<String>> {
        asked.push(group.name.clone());
        Ok(Some(group.codes()[0].clone()))
    };

    let mut selector = Selector::new(template);
    selector.resolve_with(&mut resolver).unwrap();
    let selection = selector.finish().unwrap();

    assert_eq!(asked, vec!["database"]);
    assert_eq!(
        selection.get("database").unwrap().id().code,
        "mariadb_10_4_persistent"
    );
    assert!(selection.get("search").is_some());
}

#[rstest]
fn test_headless_selector_leaves_groups_open() {
    let registry = registry();
    let template = registry.by_code("magento_2_4").unwrap();
    let mut selector = Selector::new(template);
    selector.resolve_with(&mut HeadlessSelector).unwrap();
    assert!(matches!(
        selector.finish(),
        Err(Error::MissingSelection { .. })
    ));
}

/// A required group with several variants and one explicit choice yields
/// exactly that variant, never both.
#[rstest]
fn test_explicit_choice_selects_one_database() {
    let tmp = crate::fixtures::definitions_tree();
    crate::fixtures::write_file(tmp.path(), "services/web/apache_php81.yaml", "{}\n");
    crate::fixtures::write_file(tmp.path(), "services/database/mysql8.yaml", "{}\n");
    crate::fixtures::write_file(tmp.path(), "services/database/mariadb104.yaml", "{}\n");
    crate::fixtures::write_file(
        tmp.path(),
        "templates/t.yaml",
        "services:\n  required:\n    web: [apache_php81]\n    database: [mysql8, mariadb104]\n",
    );
    let registry = TemplateRegistry::load(tmp.path()).unwrap();
    let template = registry.by_code("t").unwrap();

    let mut selector = Selector::new(template);
    selector.select(&choice("database=mariadb104")).unwrap();
    let selection = selector.finish().unwrap();

    let ids: Vec<String> = selection.ids().iter().map(ToString::to_string).collect();
    assert_eq!(ids, vec!["web=apache_php81", "database=mariadb104"]);
}

#[rstest]
fn test_overridden_project_selection_selects_cleanly() {
    let base = crate::ProjectSpec {
        services: vec!["database=mysql_8_0_persistent".to_string()],
        ..Default::default()
    };
    let local = crate::ProjectSpec {
        services: vec!["database=mariadb_10_4_persistent".to_string()],
        ..Default::default()
    };
    let composed = crate::compose_specs(&[base, local]);

    let registry = registry();
    let template = registry.by_code("php_mysql").unwrap();
    let mut selector = Selector::new(template);
    selector.select_all(&parse_choices(&composed.services).unwrap()).unwrap();
    let selection = selector.finish().unwrap();

    assert_eq!(
        selection.get("database").map(|s| s.id().code.as_str()),
        Some("mariadb_10_4_persistent")
    );
}
