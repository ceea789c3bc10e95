// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

fn parse(yaml: &str) -> Node {
    serde_yaml::from_str(yaml).expect("valid yaml")
}

fn render(node: &Node) -> String {
    serde_yaml::to_string(node).expect("serializable")
}

#[rstest]
fn test_scalar_last_writer_wins() {
    let mut base = parse("services:\n  php:\n    image: php:8.1\n");
    merge(&mut base, parse("services:\n  php:\n    image: php:8.2\n"));

    let image = base
        .get("services")
        .and_then(|s| s.get("php"))
        .and_then(|s| s.get("image"))
        .and_then(Node::as_str);
    assert_eq!(image, Some("php:8.2"));
}

#[rstest]
fn test_lists_concatenate_without_dedup() {
    let mut base = parse("ports: ['80:80', '443:443']\n");
    merge(&mut base, parse("ports: ['443:443']\n"));

    let ports = base.get("ports").and_then(Node::as_list).unwrap();
    assert_eq!(ports.len(), 3);
    assert_eq!(ports[2].as_str(), Some("443:443"));
}

#[rstest]
fn test_nested_maps_merge_recursively() {
    let mut base = parse(
        r#"
services:
  php:
    environment:
      A: "1"
    volumes: ["./:/var/www/html"]
"#,
    );
    merge(
        &mut base,
        parse(
            r#"
services:
  php:
    environment:
      B: "2"
    volumes: ["./var/log:/var/log"]
  mysql:
    image: mysql:8.0
"#,
        ),
    );

    let php = base.get("services").and_then(|s| s.get("php")).unwrap();
    let env = php.get("environment").and_then(Node::as_map).unwrap();
    assert_eq!(env.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(php.get("volumes").and_then(Node::as_list).unwrap().len(), 2);
    assert!(base.get("services").and_then(|s| s.get("mysql")).is_some());
}

#[rstest]
#[case("labels: ['a=b']\n", "labels: {c: d}\n")]
#[case("labels: {c: d}\n", "labels: ['a=b']\n")]
#[case("labels: plain\n", "labels: ['a=b']\n")]
fn test_mismatched_kinds_take_overlay(#[case] base: &str, #[case] overlay: &str) {
    let mut merged = parse(base);
    let overlay = parse(overlay);
    merge(&mut merged, overlay.clone());
    assert_eq!(merged.get("labels"), overlay.get("labels"));
}

#[rstest]
fn test_merge_preserves_insertion_order() {
    let mut base = parse("services:\n  zeta: {}\n  alpha: {}\n");
    merge(&mut base, parse("services:\n  beta: {}\n  zeta: {image: x}\n"));

    let yaml = render(&base);
    let zeta = yaml.find("zeta").unwrap();
    let alpha = yaml.find("alpha").unwrap();
    let beta = yaml.find("beta").unwrap();
    assert!(zeta < alpha && alpha < beta, "unexpected order:\n{yaml}");
}

#[rstest]
fn test_yaml_conversion_stringifies_keys() {
    let node = parse("8080: web\ntrue: yes\n");
    let map = node.as_map().unwrap();
    assert!(map.contains_key("8080"));
    assert!(map.contains_key("true"));
}

#[rstest]
fn test_scalars_survive_serialization() {
    let node = parse("a: 1\nb: true\nc: ~\nd: text\ne: 1.5\n");
    let again: Node = serde_yaml::from_str(&render(&node)).unwrap();
    assert_eq!(node, again);
}

#[rstest]
fn test_try_map_text_rewrites_keys_and_leaves() {
    let node = parse("labels:\n  router.NAME.rule: Host(`NAME`)\nports: [NAME]\n");
    let mapped = node
        .try_map_text::<(), _>(&mut |s| Ok(s.replace("NAME", "shop")))
        .unwrap();

    let labels = mapped.get("labels").and_then(Node::as_map).unwrap();
    assert_eq!(
        labels.get("router.shop.rule").and_then(Node::as_str),
        Some("Host(`shop`)")
    );
    let ports = mapped.get("ports").and_then(Node::as_list).unwrap();
    assert_eq!(ports[0].as_str(), Some("shop"));
}

#[rstest]
fn test_try_map_text_propagates_errors() {
    let node = parse("a: ok\nb: bad\n");
    let result = node.try_map_text(&mut |s| {
        if s == "bad" {
            Err(s.to_string())
        } else {
            Ok(s.to_string())
        }
    });
    assert_eq!(result, Err("bad".to_string()));
}

#[rstest]
fn test_find_text_searches_keys_and_values() {
    let node = parse("outer:\n  needle-key: 1\nlist: [a, b]\n");
    let found = node.find_text(&mut |s| s.starts_with("needle").then(|| s.to_string()));
    assert_eq!(found.as_deref(), Some("needle-key"));
    assert!(node.find_text(&mut |s| (s == "b").then_some(())).is_some());
    assert!(node.find_text(&mut |s| (s == "zzz").then_some(())).is_none());
}
