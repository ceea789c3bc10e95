// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Engine configuration.
//!
//! Loaded once by the entry point and passed by reference to whatever
//! needs it. Layers, lowest priority first: built-in defaults, a YAML file,
//! `DEVCOMPOSE_*` environment variables (`__` separates nested keys, e.g.
//! `DEVCOMPOSE_HOSTS__MANAGE=true`).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "DEVCOMPOSE";

/// Reverse proxy settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Entry point used for the TLS routers.
    pub entrypoint: String,
    /// Where certificates and their dynamic configuration live. Defaults to
    /// `certificates/` inside the target directory.
    pub certificates_dir: Option<PathBuf>,
    /// Directory the proxy container sees the certificates directory as.
    pub certificates_mount: String,
    /// Create missing certificates with mkcert.
    pub generate_certificates: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            entrypoint: "websecure".to_string(),
            certificates_dir: None,
            certificates_mount: "/certs".to_string(),
            generate_certificates: false,
        }
    }
}

/// Hosts file reconciliation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HostsConfig {
    pub file: PathBuf,
    pub ip: String,
    /// Append missing entries instead of only documenting them.
    pub manage: bool,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("/etc/hosts"),
            ip: "127.0.0.1".to_string(),
            manage: false,
        }
    }
}

/// Credential escaping settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Environment keys containing one of these (case-insensitive) hold credentials.
    pub markers: Vec<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            markers: ["PASSWORD", "PASS", "PWD", "SECRET"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Local image overrides for testing builds of published images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TestImagesConfig {
    pub enabled: bool,
    /// Published repository -> locally built repository. Tags are kept.
    pub images: BTreeMap<String, String>,
}

/// Top level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root of the template and service definitions.
    pub definitions_dir: Option<PathBuf>,
    /// Directory below the project root holding generated compositions.
    pub target_dir_name: String,
    pub proxy: ProxyConfig,
    pub hosts: HostsConfig,
    pub credentials: CredentialsConfig,
    pub test_images: TestImagesConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            definitions_dir: None,
            target_dir_name: ".devcompose".to_string(),
            proxy: ProxyConfig::default(),
            hosts: HostsConfig::default(),
            credentials: CredentialsConfig::default(),
            test_images: TestImagesConfig::default(),
        }
    }
}

impl EngineConfig {
    /// `$XDG_CONFIG_HOME/devcompose/config.yaml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("devcompose").join("config.yaml"))
    }

    /// Load from `path` (required) or the default path (optional), then
    /// apply the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`EngineConfig::load`], reading environment variables from
    /// `env` instead of the process when given.
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();
        match path {
            Some(path) => {
                builder = builder.add_source(
                    config::File::from(path)
                        .format(config::FileFormat::Yaml)
                        .required(true),
                );
            }
            None => {
                if let Some(path) = Self::default_path() {
                    builder = builder.add_source(
                        config::File::from(path)
                            .format(config::FileFormat::Yaml)
                            .required(false),
                    );
                }
            }
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );
        let config: Self = builder.build()?.try_deserialize()?;
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }

    /// Parse a YAML document without consulting the environment.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Definitions root: the configured one, else the user data directory.
    pub fn definitions_dir(&self) -> Option<PathBuf> {
        self.definitions_dir.clone().or_else(|| {
            dirs::data_dir().map(|dir| dir.join("devcompose").join("definitions"))
        })
    }
}
