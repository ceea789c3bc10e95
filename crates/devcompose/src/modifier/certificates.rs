// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::Modifier;
use super::routing::{container_name, is_routed, routers, rule_domains};
use crate::context::ModificationContext;
use crate::node::{Node, NodeMap};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./certificates_test.rs"]
mod certificates_test;

/// Dynamic proxy configuration listing the certificates, inside the
/// certificates directory.
pub const CERTIFICATES_FILE: &str = "certificates.yaml";

/// Creates a certificate/key pair for a set of domains.
pub trait CertificateGenerator {
    fn generate(&mut self, domains: &[String], cert_file: &Path, key_file: &Path) -> Result<()>;
}

/// Generates locally trusted certificates with `mkcert`.
#[derive(Debug, Clone)]
pub struct MkcertGenerator {
    program: String,
}

impl Default for MkcertGenerator {
    fn default() -> Self {
        Self {
            program: "mkcert".to_string(),
        }
    }
}

impl MkcertGenerator {
    pub fn with_program<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl CertificateGenerator for MkcertGenerator {
    fn generate(&mut self, domains: &[String], cert_file: &Path, key_file: &Path) -> Result<()> {
        tracing::info!(program = %self.program, domains = ?domains, "generating certificate");
        let output = Command::new(&self.program)
            .arg("-cert-file")
            .arg(cert_file)
            .arg("-key-file")
            .arg(key_file)
            .args(domains)
            .output()
            .map_err(|e| Error::ExternalTool {
                tool: self.program.clone(),
                message: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(Error::ExternalTool {
                tool: self.program.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Keeps certificate bookkeeping in line with the TLS routers.
///
/// Every container with a TLS router needs a certificate for the domains
/// its rules match. Missing entries are appended to the dynamic
/// configuration file, entries already present are left as they are. The
/// updated file is staged on the context and written by the materializer,
/// so a failing pipeline leaves it untouched.
pub struct CertificatesModifier {
    dir: Option<PathBuf>,
    mount: String,
    generator: Option<Box<dyn CertificateGenerator>>,
}

impl CertificatesModifier {
    pub const SORT_ORDER: i32 = 30;

    /// `dir` defaults to `certificates/` inside the target directory.
    /// `mount` is where the proxy container sees that directory.
    pub fn new<S: Into<String>>(dir: Option<PathBuf>, mount: S) -> Self {
        Self {
            dir,
            mount: mount.into(),
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: Box<dyn CertificateGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }
}

impl std::fmt::Debug for CertificatesModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificatesModifier")
            .field("dir", &self.dir)
            .field("mount", &self.mount)
            .field("generator", &self.generator.is_some())
            .finish()
    }
}

/// Container name -> domains, in order of first appearance.
pub(crate) fn required_certificates(ctx: &ModificationContext) -> Vec<(String, Vec<String>)> {
    let mut needed: Vec<(String, Vec<String>)> = Vec::new();
    for doc in ctx.documents() {
        let Some(services) = doc.services() else {
            continue;
        };
        for (name, service) in services {
            if !is_routed(service) {
                continue;
            }
            let domains: Vec<String> = routers(service)
                .into_iter()
                .filter(|r| r.tls)
                .filter_map(|r| r.rule)
                .flat_map(|rule| rule_domains(&rule))
                .collect();
            if domains.is_empty() {
                continue;
            }
            let container = container_name(name, service);
            let index = match needed.iter().position(|(c, _)| *c == container) {
                Some(index) => index,
                None => {
                    needed.push((container, Vec::new()));
                    needed.len() - 1
                }
            };
            let entry = &mut needed[index].1;
            for domain in domains {
                if !entry.contains(&domain) {
                    entry.push(domain);
                }
            }
        }
    }
    needed
}

impl Modifier for CertificatesModifier {
    fn name(&self) -> &'static str {
        "certificates"
    }

    fn sort_order(&self) -> i32 {
        Self::SORT_ORDER
    }

    fn modify(&mut self, ctx: &mut ModificationContext) -> Result<()> {
        let needed = required_certificates(ctx);
        if needed.is_empty() {
            return Ok(());
        }

        let dir = self
            .dir
            .clone()
            .unwrap_or_else(|| ctx.target_dir.join("certificates"));
        let config_path = dir.join(CERTIFICATES_FILE);
        let mut config = match ctx.staged_file(&config_path) {
            Some(yaml) => parse_config(yaml, &config_path)?,
            None => load_config(&config_path)?,
        };
        let entries = certificate_entries(&mut config, &config_path)?;

        let mut added = 0;
        for (container, _) in &needed {
            let cert_file = format!("{}/{container}.pem", self.mount);
            let registered = entries
                .iter()
                .any(|e| e.get("certFile").and_then(Node::as_str) == Some(cert_file.as_str()));
            if registered {
                tracing::debug!(%container, "certificate already registered");
                continue;
            }
            let mut entry = NodeMap::new();
            entry.insert("certFile".to_string(), Node::string(cert_file));
            entry.insert(
                "keyFile".to_string(),
                Node::string(format!("{}/{container}-key.pem", self.mount)),
            );
            entries.push(Node::Map(entry));
            added += 1;
        }
        if added > 0 {
            let yaml = serde_yaml::to_string(&config).map_err(|e| Error::yaml(Some(&config_path), e))?;
            ctx.stage_file(&config_path, yaml);
            tracing::info!(file = %config_path.display(), added, "registered certificates");
        }

        if let Some(generator) = self.generator.as_mut() {
            std::fs::create_dir_all(&dir)?;
            for (container, domains) in &needed {
                let cert = dir.join(format!("{container}.pem"));
                let key = dir.join(format!("{container}-key.pem"));
                if cert.is_file() && key.is_file() {
                    continue;
                }
                generator.generate(domains, &cert, &key)?;
            }
        }

        let mut body = format!(
            "TLS certificates are registered in `{}`.\n\n",
            config_path.display()
        );
        for (container, domains) in &needed {
            let _ = writeln!(body, "- `{container}`: {}", domains.join(", "));
        }
        body.push_str("\nTo create missing certificates by hand:\n\n```shell\n");
        for (container, domains) in &needed {
            let _ = writeln!(
                body,
                "mkcert -cert-file {dir}/{container}.pem -key-file {dir}/{container}-key.pem {}",
                domains.join(" "),
                dir = dir.display(),
            );
        }
        body.push_str("```\n");
        ctx.readme.set_section(Self::SORT_ORDER, "Certificates", body);
        Ok(())
    }
}

fn load_config(path: &Path) -> Result<Node> {
    if !path.is_file() {
        return Ok(Node::default());
    }
    let yaml = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
        path: path.to_path_buf(),
        error: e,
    })?;
    parse_config(&yaml, path)
}

fn parse_config(yaml: &str, path: &Path) -> Result<Node> {
    if yaml.trim().is_empty() {
        return Ok(Node::default());
    }
    serde_yaml::from_str(yaml).map_err(|e| Error::yaml(Some(path), e))
}

fn certificate_entries<'a>(config: &'a mut Node, path: &Path) -> Result<&'a mut Vec<Node>> {
    let malformed =
        || Error::ValidationFailed(format!("{}: expected tls.certificates to be a list", path.display()));
    let root = config.as_map_mut().ok_or_else(malformed)?;
    let tls = root
        .entry("tls".to_string())
        .or_insert_with(Node::default)
        .as_map_mut()
        .ok_or_else(malformed)?;
    tls.entry("certificates".to_string())
        .or_insert_with(|| Node::List(Vec::new()))
        .as_list_mut()
        .ok_or_else(malformed)
}
