// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use super::Modifier;
use super::routing::{is_routed, routers, rule_domains};
use crate::context::ModificationContext;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./hosts_test.rs"]
mod hosts_test;

/// Makes sure every routed domain resolves locally.
///
/// Domains come from the `Host(...)` rules of both documents plus the
/// domains of the context. Only domains missing from the hosts file are
/// appended, and only when `manage` is set. The README always lists the
/// line the composition needs.
#[derive(Debug, Clone)]
pub struct HostsModifier {
    file: PathBuf,
    ip: String,
    manage: bool,
}

impl HostsModifier {
    pub const SORT_ORDER: i32 = 40;

    pub fn new<P: Into<PathBuf>, S: Into<String>>(file: P, ip: S, manage: bool) -> Self {
        Self {
            file: file.into(),
            ip: ip.into(),
            manage,
        }
    }
}

/// Every domain the composition routes, in order of first appearance.
pub(crate) fn routed_domains(ctx: &ModificationContext) -> Vec<String> {
    let mut domains: Vec<String> = ctx.domains.clone();
    for doc in ctx.documents() {
        let Some(services) = doc.services() else {
            continue;
        };
        for service in services.values().filter(|s| is_routed(s)) {
            for rule in routers(service).into_iter().filter_map(|r| r.rule) {
                for domain in rule_domains(&rule) {
                    if !domains.contains(&domain) {
                        domains.push(domain);
                    }
                }
            }
        }
    }
    domains
}

/// Host names already present in a hosts file, for any address.
pub(crate) fn registered_hosts(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(|line| line.split_whitespace().skip(1).map(str::to_string).collect::<Vec<_>>())
        .collect()
}

fn read_hosts(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        }),
    }
}

impl Modifier for HostsModifier {
    fn name(&self) -> &'static str {
        "hosts"
    }

    fn sort_order(&self) -> i32 {
        Self::SORT_ORDER
    }

    fn modify(&mut self, ctx: &mut ModificationContext) -> Result<()> {
        let domains = routed_domains(ctx);
        if domains.is_empty() {
            return Ok(());
        }

        let content = read_hosts(&self.file)?;
        let registered = registered_hosts(&content);
        let missing: Vec<&String> = domains.iter().filter(|d| !registered.contains(*d)).collect();

        if missing.is_empty() {
            tracing::debug!(file = %self.file.display(), "all domains already registered");
        } else if self.manage {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&self.file)?;
            let separator = if content.is_empty() || content.ends_with('\n') {
                ""
            } else {
                "\n"
            };
            let line = format!(
                "{separator}{} {}\n",
                self.ip,
                missing.iter().map(|d| d.as_str()).collect::<Vec<_>>().join(" ")
            );
            file.write_all(line.as_bytes())?;
            tracing::info!(file = %self.file.display(), added = missing.len(), "registered domains");
        } else {
            tracing::warn!(
                file = %self.file.display(),
                domains = %missing.iter().map(|d| d.as_str()).collect::<Vec<_>>().join(" "),
                "domains are not registered in the hosts file"
            );
        }

        let body = format!(
            "The following line must be present in `{}`:\n\n```\n{} {}\n```\n",
            self.file.display(),
            self.ip,
            domains.join(" ")
        );
        ctx.readme.set_section(Self::SORT_ORDER, "Hosts", body);
        Ok(())
    }
}
