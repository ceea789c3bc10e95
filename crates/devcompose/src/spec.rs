// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Project file parsing and data types for .devcompose.yaml files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "./spec_test.rs"]
mod spec_test;

/// API version for definition and project files.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "devcompose/v0")]
    V0,
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: ApiVersion,
}

/// Composition request persisted in a .devcompose.yaml file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectSpec {
    /// API version identifier.
    #[serde(default)]
    pub api: ApiVersion,

    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Other project files loaded before this one.
    /// Can use absolute paths, home-relative (~/) paths, or relative paths.
    /// Relative paths are resolved relative to this file's directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    /// Template code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Required service selections (`group=code` or bare `code`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,

    /// Optional service selections (`group=code`, `group=` or bare `code`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional: Vec<String>,

    /// Domains routed to the composition, the first one is the main domain.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,

    /// Explicit parameter values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,

    /// Output directory, relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl ProjectSpec {
    /// Parse spec from YAML string.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        let yaml = yaml.into();

        // Stage 1: Parse to get API version
        let value: serde_yaml::Value =
            serde_yaml::from_str(&yaml).map_err(|e| crate::Error::yaml(None, e))?;

        let with_version: ApiVersionMapping = serde_yaml::from_value(value.clone())
            .map_err(|e| crate::Error::yaml(None, e))?;

        // Stage 2: Deserialize based on version
        match with_version.api {
            ApiVersion::V0 => {
                serde_yaml::from_value(value).map_err(|e| crate::Error::yaml(None, e))
            }
        }
    }

    /// Load spec from file path.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut spec = Self::from_yaml(yaml).map_err(|err| match err {
            crate::Error::InvalidYaml { error, .. } => crate::Error::yaml(Some(path), error),
            other => other,
        })?;
        spec.source_path = Some(path.to_path_buf());
        Ok(spec)
    }

    /// Directory containing the file this spec was loaded from.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source_path.as_deref().and_then(Path::parent)
    }

    /// Validate spec after loading.
    pub fn validate(&self) -> crate::Result<()> {
        validate_domains(&self.domains)?;
        if let Some(target) = &self.target {
            if target.is_absolute() {
                return Err(crate::Error::ValidationFailed(format!(
                    "target {target:?} must be relative to the project root"
                )));
            }
        }
        Ok(())
    }
}

/// Reject domain names that cannot be used as a routing rule or as the
/// name of the target directory.
pub fn validate_domains(domains: &[String]) -> crate::Result<()> {
    let invalid = domains.iter().find(|d| {
        d.is_empty()
            || *d == "."
            || d.contains("..")
            || d
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '`' | '/' | '\\'))
    });
    match invalid {
        Some(domain) => Err(crate::Error::ValidationFailed(format!(
            "invalid domain name '{domain}'"
        ))),
        None => Ok(()),
    }
}
