// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Service catalog: every selectable service variant, grouped by name.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::node::Node;
use crate::spec::ApiVersion;
use crate::version::VersionRange;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./catalog_test.rs"]
mod catalog_test;

/// Placeholder syntax used inside fragments: `{{parameter_name}}`.
pub(crate) static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Whether a template requires or merely offers a service group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceKind {
    Required,
    Optional,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("required"),
            Self::Optional => f.write_str("optional"),
        }
    }
}

/// Identity of a variant: its group and its code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantId {
    pub group: String,
    pub code: String,
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.group, self.code)
    }
}

/// On-disk shape of a service variant definition.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VariantDefinition {
    #[serde(default)]
    api: ApiVersion,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    dev_only: bool,
    #[serde(default)]
    parameters: BTreeMap<String, Option<serde_yaml::Value>>,
    #[serde(default)]
    requires: BTreeMap<String, VersionRange>,
    #[serde(default)]
    compose: Option<Node>,
    #[serde(default)]
    dev_tools: Option<Node>,
}

/// A concrete, selectable implementation of a service group.
///
/// Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ServiceVariant {
    pub id: VariantId,
    pub description: Option<String>,
    /// Only merged into the dev-tools document.
    pub dev_only: bool,
    /// Production fragment.
    pub fragment: Node,
    /// Extra fragment merged into the dev-tools document only.
    pub dev_tools: Option<Node>,
    /// Parameter name -> raw default declared by this variant.
    pub parameters: BTreeMap<String, Option<String>>,
    /// Package -> version range hints used for template suitability.
    pub requires: BTreeMap<String, VersionRange>,
    pub source_path: PathBuf,
}

impl ServiceVariant {
    /// Parse a variant definition. `group` and the fallback code come from
    /// the file location when loading from disk.
    pub fn from_yaml(group: &str, fallback_code: &str, yaml: &str, path: &Path) -> Result<Self> {
        let def: VariantDefinition =
            serde_yaml::from_str(yaml).map_err(|e| Error::yaml(Some(path), e))?;
        let ApiVersion::V0 = def.api;

        let fragment = def.compose.unwrap_or_default();
        if fragment.as_map().is_none() {
            return Err(Error::definition(path, "'compose' must be a mapping"));
        }
        if let Some(dev) = &def.dev_tools {
            if dev.as_map().is_none() {
                return Err(Error::definition(path, "'dev_tools' must be a mapping"));
            }
        }

        let mut parameters = BTreeMap::new();
        for (name, raw) in def.parameters {
            let raw = match raw {
                None | Some(serde_yaml::Value::Null) => None,
                Some(serde_yaml::Value::String(s)) => Some(s),
                Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
                Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
                Some(_) => {
                    return Err(Error::definition(
                        path,
                        format!("parameter '{name}' must have a scalar default"),
                    ));
                }
            };
            parameters.insert(name, raw);
        }

        let mut variant = Self {
            id: VariantId {
                group: group.to_string(),
                code: def.code.unwrap_or_else(|| fallback_code.to_string()),
            },
            description: def.description,
            dev_only: def.dev_only,
            fragment,
            dev_tools: def.dev_tools,
            parameters,
            requires: def.requires,
            source_path: path.to_path_buf(),
        };

        // Placeholders found in the fragments are implicit declarations.
        for name in variant.placeholder_names() {
            variant.parameters.entry(name).or_insert(None);
        }
        Ok(variant)
    }

    /// Load a variant from `<services>/<group>/<code>.yaml`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let group = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::definition(path, "cannot determine service group"))?;
        let code = path
            .file_stem()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::definition(path, "cannot determine service code"))?;
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::from_yaml(group, code, &yaml, path)
    }

    /// Parameter names this variant reads.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    fn placeholder_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for fragment in std::iter::once(&self.fragment).chain(self.dev_tools.as_ref()) {
            fragment.find_text(&mut |text: &str| {
                for caps in PLACEHOLDER.captures_iter(text) {
                    names.insert(caps[1].to_string());
                }
                None::<()>
            });
        }
        names
    }
}

/// All known service variants, keyed by group then code.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    groups: BTreeMap<String, BTreeMap<String, Arc<ServiceVariant>>>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `<group>/<code>.yaml` below `root`.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let mut catalog = Self::new();
        for group_dir in sorted_entries(root)? {
            if !group_dir.is_dir() {
                continue;
            }
            for file in sorted_entries(&group_dir)? {
                if is_yaml(&file) {
                    catalog.insert(ServiceVariant::load(&file)?)?;
                }
            }
        }
        tracing::debug!(
            groups = catalog.groups.len(),
            root = %root.display(),
            "loaded service catalog"
        );
        Ok(catalog)
    }

    /// Add a variant. Codes must be unique within their group.
    pub fn insert(&mut self, variant: ServiceVariant) -> Result<()> {
        let group = self.groups.entry(variant.id.group.clone()).or_default();
        if let Some(existing) = group.get(&variant.id.code) {
            return Err(Error::definition(
                &variant.source_path,
                format!(
                    "service '{}' is already defined in {}",
                    variant.id,
                    existing.source_path.display()
                ),
            ));
        }
        group.insert(variant.id.code.clone(), Arc::new(variant));
        Ok(())
    }

    pub fn get(&self, group: &str, code: &str) -> Option<&Arc<ServiceVariant>> {
        self.groups.get(group).and_then(|g| g.get(code))
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn variants(&self) -> impl Iterator<Item = &Arc<ServiceVariant>> {
        self.groups.values().flat_map(BTreeMap::values)
    }
}

pub(crate) fn is_yaml(path: &Path) -> bool {
    path.is_file()
        && matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        )
}

/// Directory entries in name order so loading is deterministic.
pub(crate) fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let read = std::fs::read_dir(dir).map_err(|e| Error::ReadFailed {
        path: dir.to_path_buf(),
        error: e,
    })?;
    let mut entries = read
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}
