// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;
use crate::fixtures::{definitions_tree, registry, write_file};

fn version(s: &str) -> Version {
    s.parse().unwrap()
}

#[rstest]
fn test_sample_registry_loads() {
    let registry = registry();
    let codes: Vec<&str> = registry.templates().map(|t| t.code.as_str()).collect();
    assert_eq!(codes, vec!["magento_2_4", "php_7_4_mysql", "php_mysql"]);

    let template = registry.by_code("php_mysql").unwrap();
    assert_eq!(template.group_names(), vec!["php", "database", "cache", "dbadmin"]);
    assert_eq!(
        template
            .groups_of(ServiceKind::Optional)
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>(),
        vec!["cache", "dbadmin"]
    );
    assert_eq!(
        template.group("database").unwrap().codes(),
        vec!["mysql_8_0_persistent", "mariadb_10_4_persistent"]
    );
    assert_eq!(template.runner("php").unwrap().service, "php");
}

#[rstest]
fn test_required_group_without_variants_fails_at_load() {
    let tmp = definitions_tree();
    write_file(tmp.path(), "services/php/php_8_1.yaml", "{}\n");
    write_file(
        tmp.path(),
        "templates/broken.yaml",
        "services:\n  required:\n    php: [php_8_1]\n    database: []\n",
    );

    let err = TemplateRegistry::load(tmp.path()).unwrap_err();
    match err {
        Error::InvalidDefinition { reason, .. } => assert!(reason.contains("database")),
        other => panic!("expected InvalidDefinition, got {other:?}"),
    }
}

#[rstest]
fn test_empty_optional_group_is_allowed() {
    let tmp = definitions_tree();
    write_file(tmp.path(), "services/php/php_8_1.yaml", "{}\n");
    write_file(
        tmp.path(),
        "templates/minimal.yaml",
        "services:\n  required:\n    php: [php_8_1]\n  optional:\n    cache: []\n",
    );

    let registry = TemplateRegistry::load(tmp.path()).unwrap();
    let template = registry.by_code("minimal").unwrap();
    assert!(template.group("cache").unwrap().variants().is_empty());
}

#[rstest]
#[case::unknown_service("services:\n  required:\n    php: [php_9_9]\n", "unknown service")]
#[case::listed_twice("services:\n  required:\n    php: [php_8_1, php_8_1]\n", "listed twice")]
#[case::group_twice(
    "services:\n  required:\n    php: [php_8_1]\n  optional:\n    php: [php_8_1]\n",
    "more than once"
)]
#[case::empty_runner(
    "services:\n  required:\n    php: [php_8_1]\nrunners:\n  php: \"\"\n",
    "runner"
)]
fn test_template_validation(#[case] yaml: &str, #[case] expected: &str) {
    let tmp = definitions_tree();
    write_file(tmp.path(), "services/php/php_8_1.yaml", "{}\n");
    write_file(tmp.path(), "templates/bad.yaml", yaml);

    let err = TemplateRegistry::load(tmp.path()).unwrap_err();
    match err {
        Error::InvalidDefinition { reason, .. } => {
            assert!(reason.contains(expected), "{reason}")
        }
        other => panic!("expected InvalidDefinition, got {other:?}"),
    }
}

#[rstest]
fn test_by_code_suggests_similar() {
    let registry = registry();
    let err = registry.by_code("php").unwrap_err();
    match err {
        Error::TemplateNotFound { code, similar } => {
            assert_eq!(code, "php");
            assert_eq!(similar, vec!["php_7_4_mysql", "php_mysql"]);
        }
        other => panic!("expected TemplateNotFound, got {other:?}"),
    }
}

#[rstest]
fn test_by_code_no_suggestions() {
    let registry = registry();
    match registry.by_code("nginx").unwrap_err() {
        Error::TemplateNotFound { similar, .. } => assert!(similar.is_empty()),
        other => panic!("expected TemplateNotFound, got {other:?}"),
    }
}

#[rstest]
#[case("2.4.5", vec!["magento_2_4", "php_mysql"])]
#[case("2.3.7", vec!["php_7_4_mysql", "php_mysql"])]
#[case("2.1.0", vec!["php_mysql"])]
#[case("3.0.0", vec![])]
fn test_recommended_templates_narrowest_first(#[case] ver: &str, #[case] expected: Vec<&str>) {
    let registry = registry();
    let found: Vec<&str> = registry
        .recommended_templates("magento/product-community-edition", &version(ver))
        .into_iter()
        .map(|t| t.code.as_str())
        .collect();
    assert_eq!(found, expected);
}

#[rstest]
fn test_recommended_templates_unknown_package() {
    let registry = registry();
    assert!(
        registry
            .recommended_templates("laravel/framework", &version("10.0"))
            .is_empty()
    );
}

#[rstest]
fn test_suitable_templates() {
    let registry = registry();

    let mut locked = BTreeMap::new();
    locked.insert("php".to_string(), version("7.4.33"));
    let found: Vec<&str> = registry
        .suitable_templates(&locked)
        .into_iter()
        .map(|t| t.code.as_str())
        .collect();
    assert_eq!(found, vec!["php_7_4_mysql"]);

    locked.insert("php".to_string(), version("8.1.20"));
    let found: Vec<&str> = registry
        .suitable_templates(&locked)
        .into_iter()
        .map(|t| t.code.as_str())
        .collect();
    assert_eq!(found, vec!["magento_2_4", "php_mysql"]);

    locked.clear();
    locked.insert("elasticsearch".to_string(), version("7.16.3"));
    let found: Vec<&str> = registry
        .suitable_templates(&locked)
        .into_iter()
        .map(|t| t.code.as_str())
        .collect();
    assert_eq!(found, vec!["magento_2_4"]);
}
