// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Build manifest written next to the generated files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::materialize::{Materialized, write_file};
use crate::{Error, MANIFEST_FILENAME, Result};

#[cfg(test)]
#[path = "./manifest_test.rs"]
mod manifest_test;

/// Manifest API version.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum ManifestApiVersion {
    #[serde(rename = "devcompose/v0/manifest")]
    V0,
}

/// When and where the manifest was generated.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GenerationMetadata {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub hostname: String,
}

impl GenerationMetadata {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// A generated file and its digest.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct OutputFile {
    pub file: String,
    pub sha256: String,
}

/// Everything needed to reproduce a build, plus digests of what it wrote.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BuildManifest {
    pub api: ManifestApiVersion,
    pub generated: GenerationMetadata,
    pub template: String,
    /// Selected variants as `group=code`.
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    /// Resolved parameter values, secrets included.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub outputs: Vec<OutputFile>,
}

impl BuildManifest {
    pub fn new<S: Into<String>>(template: S) -> Self {
        Self {
            api: ManifestApiVersion::V0,
            generated: GenerationMetadata::now(),
            template: template.into(),
            services: Vec::new(),
            domains: Vec::new(),
            parameters: BTreeMap::new(),
            outputs: Vec::new(),
        }
    }

    /// Location of the manifest inside a target directory.
    pub fn path_in(target_dir: &Path) -> PathBuf {
        target_dir.join(MANIFEST_FILENAME)
    }

    /// Record the digest of every materialized file.
    pub fn record_outputs(&mut self, materialized: &Materialized) {
        self.outputs = materialized
            .files
            .iter()
            .map(|f| OutputFile {
                file: f.name.clone(),
                sha256: sha256_hex(f.content.as_bytes()),
            })
            .collect();
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::yaml(None, e))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::yaml(None, e))
    }

    /// Load the manifest of a target directory, if one was written.
    pub fn load(target_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(target_dir);
        let yaml = match std::fs::read_to_string(&path) {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(Error::ReadFailed { path, error }),
        };
        serde_yaml::from_str(&yaml)
            .map(Some)
            .map_err(|e| Error::yaml(Some(&path), e))
    }

    pub fn save(&self, target_dir: &Path) -> Result<PathBuf> {
        let path = Self::path_in(target_dir);
        write_file(&path, self.to_yaml()?.as_bytes())?;
        tracing::debug!(file = %path.display(), "wrote build manifest");
        Ok(path)
    }

    /// Compare the recorded digests with the files on disk.
    pub fn verify(&self, target_dir: &Path) -> Result<Vec<ManifestChange>> {
        let mut changes = Vec::new();
        for output in &self.outputs {
            let path = target_dir.join(&output.file);
            let content = match std::fs::read(&path) {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    changes.push(ManifestChange {
                        kind: ManifestChangeKind::OutputMissing,
                        file: output.file.clone(),
                        expected: output.sha256.clone(),
                        actual: None,
                    });
                    continue;
                }
                Err(error) => return Err(Error::ReadFailed { path, error }),
            };
            let actual = sha256_hex(&content);
            if actual != output.sha256 {
                changes.push(ManifestChange {
                    kind: ManifestChangeKind::OutputChanged,
                    file: output.file.clone(),
                    expected: output.sha256.clone(),
                    actual: Some(actual),
                });
            }
        }
        Ok(changes)
    }
}

/// Verify the manifest of `target_dir` against the files next to it.
pub fn verify_manifest(target_dir: &Path) -> Result<Vec<ManifestChange>> {
    let Some(manifest) = BuildManifest::load(target_dir)? else {
        return Err(Error::ValidationFailed(format!(
            "no {MANIFEST_FILENAME} in {}",
            target_dir.display()
        )));
    };
    manifest.verify(target_dir)
}

pub(crate) fn sha256_hex(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// A generated file that no longer matches the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestChange {
    pub kind: ManifestChangeKind,
    pub file: String,
    pub expected: String,
    pub actual: Option<String>,
}

/// Types of manifest mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestChangeKind {
    OutputChanged,
    OutputMissing,
}

impl std::fmt::Display for ManifestChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutputChanged => f.write_str("changed"),
            Self::OutputMissing => f.write_str("missing"),
        }
    }
}
