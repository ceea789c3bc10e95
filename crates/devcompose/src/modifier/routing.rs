// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Reading and writing reverse proxy labels on compose services.
//!
//! Labels may be a list of `key=value` strings or a map. Writers keep
//! whichever form the service already uses.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::Node;

#[cfg(test)]
#[path = "./routing_test.rs"]
mod routing_test;

const ROUTER_PREFIX: &str = "traefik.http.routers.";

static HOST_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Host\(([^)]*)\)").expect("host rule pattern is valid"));

/// All labels of a service as key/value pairs, in declaration order.
pub fn labels(service: &Node) -> Vec<(String, String)> {
    match service.get("labels") {
        Some(Node::List(items)) => items
            .iter()
            .filter_map(Node::as_str)
            .map(|item| match item.split_once('=') {
                Some((k, v)) => (k.trim().to_string(), v.trim().to_string()),
                None => (item.trim().to_string(), String::new()),
            })
            .collect(),
        Some(Node::Map(map)) => map
            .iter()
            .map(|(k, v)| (k.clone(), v.scalar_text().unwrap_or_default()))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn label(service: &Node, key: &str) -> Option<String> {
    labels(service)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

/// Add a label unless one with the same key exists. Returns whether it was added.
pub fn add_label(service: &mut Node, key: &str, value: &str) -> bool {
    if label(service, key).is_some() {
        return false;
    }
    let Some(map) = service.as_map_mut() else {
        return false;
    };
    match map
        .entry("labels".to_string())
        .or_insert_with(|| Node::List(Vec::new()))
    {
        Node::List(items) => items.push(Node::string(format!("{key}={value}"))),
        Node::Map(labels) => {
            labels.insert(key.to_string(), Node::string(value));
        }
        other => *other = Node::List(vec![Node::string(format!("{key}={value}"))]),
    }
    true
}

/// Whether the proxy is told to route this service.
pub fn is_routed(service: &Node) -> bool {
    label(service, "traefik.enable").is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// A router declared through `traefik.http.routers.<name>.*` labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Router {
    pub name: String,
    pub rule: Option<String>,
    pub entrypoints: Option<String>,
    pub service: Option<String>,
    pub tls: bool,
}

/// Routers of a service, in order of first appearance.
pub fn routers(service: &Node) -> Vec<Router> {
    let mut routers: Vec<Router> = Vec::new();
    for (key, value) in labels(service) {
        let Some(rest) = key.strip_prefix(ROUTER_PREFIX) else {
            continue;
        };
        let Some((name, property)) = rest.split_once('.') else {
            continue;
        };
        let index = match routers.iter().position(|r| r.name == name) {
            Some(index) => index,
            None => {
                routers.push(Router {
                    name: name.to_string(),
                    ..Default::default()
                });
                routers.len() - 1
            }
        };
        let router = &mut routers[index];
        match property {
            "rule" => router.rule = Some(value),
            "entrypoints" => router.entrypoints = Some(value),
            "service" => router.service = Some(value),
            "tls" => router.tls = value.eq_ignore_ascii_case("true"),
            _ => {
                if property.starts_with("tls.") {
                    router.tls = true;
                }
            }
        }
    }
    routers
}

pub fn router_label(router: &str, property: &str) -> String {
    format!("{ROUTER_PREFIX}{router}.{property}")
}

/// Domains named by `Host(...)` matchers of a rule.
pub fn rule_domains(rule: &str) -> Vec<String> {
    let mut domains = Vec::new();
    for caps in HOST_RULE.captures_iter(rule) {
        for host in caps[1].split(',') {
            let host = host.trim().trim_matches(|c: char| c == '`' || c == '"' || c == '\'');
            if !host.is_empty() && !domains.iter().any(|d| d == host) {
                domains.push(host.to_string());
            }
        }
    }
    domains
}

/// Name the container of `service` runs as.
pub fn container_name(name: &str, service: &Node) -> String {
    service
        .get("container_name")
        .and_then(Node::as_str)
        .unwrap_or(name)
        .to_string()
}

