// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Templates and the registry that loads and recommends them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::catalog::{ServiceCatalog, ServiceKind, ServiceVariant, is_yaml, sorted_entries};
use crate::spec::ApiVersion;
use crate::version::{Version, VersionRange};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./template_test.rs"]
mod template_test;

/// Directory below the definitions root holding template files.
pub const TEMPLATES_DIR: &str = "templates";

/// Directory below the definitions root holding service variants.
pub const SERVICES_DIR: &str = "services";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServicesDefinition {
    #[serde(default)]
    required: IndexMap<String, Vec<String>>,
    #[serde(default)]
    optional: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateDefinition {
    #[serde(default)]
    api: ApiVersion,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    services: ServicesDefinition,
    #[serde(default)]
    runners: IndexMap<String, String>,
    #[serde(default)]
    compatibility: Vec<Compatibility>,
}

/// Package/version hint used only for recommendations.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Compatibility {
    pub package: String,
    pub versions: VersionRange,
}

/// Service that receives ad-hoc interactive commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runner {
    pub name: String,
    pub service: String,
}

/// A named slot of a template and the variants that may fill it.
#[derive(Debug, Clone)]
pub struct ServiceGroup {
    pub name: String,
    pub kind: ServiceKind,
    variants: Vec<Arc<ServiceVariant>>,
}

impl ServiceGroup {
    pub fn variants(&self) -> &[Arc<ServiceVariant>] {
        &self.variants
    }

    pub fn variant(&self, code: &str) -> Option<&Arc<ServiceVariant>> {
        self.variants.iter().find(|v| v.id.code == code)
    }

    pub fn codes(&self) -> Vec<String> {
        self.variants.iter().map(|v| v.id.code.clone()).collect()
    }
}

/// A reusable blueprint naming required and optional service groups.
#[derive(Debug, Clone)]
pub struct Template {
    pub code: String,
    pub description: Option<String>,
    groups: Vec<ServiceGroup>,
    runners: Vec<Runner>,
    compatibility: Vec<Compatibility>,
    pub source_path: PathBuf,
}

impl Template {
    /// Parse a template and bind its variant codes against `catalog`.
    pub fn from_yaml(
        yaml: &str,
        fallback_code: &str,
        path: &Path,
        catalog: &ServiceCatalog,
    ) -> Result<Self> {
        let def: TemplateDefinition =
            serde_yaml::from_str(yaml).map_err(|e| Error::yaml(Some(path), e))?;
        let ApiVersion::V0 = def.api;

        let mut groups = Vec::new();
        let partitions = [
            (ServiceKind::Required, def.services.required),
            (ServiceKind::Optional, def.services.optional),
        ];
        for (kind, declared) in partitions {
            for (name, codes) in declared {
                if groups.iter().any(|g: &ServiceGroup| g.name == name) {
                    return Err(Error::definition(
                        path,
                        format!("group '{name}' is declared more than once"),
                    ));
                }
                if kind == ServiceKind::Required && codes.is_empty() {
                    return Err(Error::definition(
                        path,
                        format!("required group '{name}' has no services"),
                    ));
                }
                let mut variants: Vec<Arc<ServiceVariant>> = Vec::with_capacity(codes.len());
                for code in codes {
                    let variant = catalog.get(&name, &code).ok_or_else(|| {
                        Error::definition(path, format!("unknown service '{name}={code}'"))
                    })?;
                    if variants.iter().any(|v| v.id.code == code) {
                        return Err(Error::definition(
                            path,
                            format!("service '{name}={code}' is listed twice"),
                        ));
                    }
                    variants.push(Arc::clone(variant));
                }
                groups.push(ServiceGroup {
                    name,
                    kind,
                    variants,
                });
            }
        }

        let mut runners = Vec::with_capacity(def.runners.len());
        for (name, service) in def.runners {
            if service.trim().is_empty() {
                return Err(Error::definition(
                    path,
                    format!("runner '{name}' does not name a service"),
                ));
            }
            runners.push(Runner { name, service });
        }

        Ok(Self {
            code: def.code.unwrap_or_else(|| fallback_code.to_string()),
            description: def.description,
            groups,
            runners,
            compatibility: def.compatibility,
            source_path: path.to_path_buf(),
        })
    }

    /// Load a template file; the code defaults to the file stem.
    pub fn load<P: AsRef<Path>>(path: P, catalog: &ServiceCatalog) -> Result<Self> {
        let path = path.as_ref();
        let code = path
            .file_stem()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::definition(path, "cannot determine template code"))?;
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::from_yaml(&yaml, code, path, catalog)
    }

    /// Groups in declaration order, required groups first.
    pub fn groups(&self) -> &[ServiceGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&ServiceGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn groups_of(&self, kind: ServiceKind) -> impl Iterator<Item = &ServiceGroup> {
        self.groups.iter().filter(move |g| g.kind == kind)
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    pub fn runners(&self) -> &[Runner] {
        &self.runners
    }

    pub fn runner(&self, name: &str) -> Option<&Runner> {
        self.runners.iter().find(|r| r.name == name)
    }

    pub fn compatibility(&self) -> &[Compatibility] {
        &self.compatibility
    }

    /// Narrowest declared range for `package` that contains `version`.
    fn best_range(&self, package: &str, version: &Version) -> Option<&VersionRange> {
        self.compatibility
            .iter()
            .filter(|c| c.package == package && c.versions.contains(version))
            .map(|c| &c.versions)
            .min_by(|a, b| a.cmp_specificity(b))
    }

    fn suits(&self, locked: &BTreeMap<String, Version>) -> bool {
        self.groups
            .iter()
            .flat_map(|g| g.variants.iter())
            .flat_map(|v| v.requires.iter())
            .any(|(package, range)| locked.get(package).is_some_and(|ver| range.contains(ver)))
    }
}

/// All templates plus the catalog their groups were bound against.
///
/// Loaded once at startup, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    catalog: ServiceCatalog,
    templates: BTreeMap<String, Template>,
}

impl TemplateRegistry {
    pub fn new(catalog: ServiceCatalog) -> Self {
        Self {
            catalog,
            templates: BTreeMap::new(),
        }
    }

    /// Load `<root>/services/<group>/<code>.yaml` and `<root>/templates/<code>.yaml`.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let catalog = ServiceCatalog::load(root.join(SERVICES_DIR))?;
        let mut registry = Self::new(catalog);
        for file in sorted_entries(&root.join(TEMPLATES_DIR))? {
            if is_yaml(&file) {
                let template = Template::load(&file, &registry.catalog)?;
                registry.insert(template)?;
            }
        }
        tracing::debug!(
            templates = registry.templates.len(),
            root = %root.display(),
            "loaded template registry"
        );
        Ok(registry)
    }

    /// Add a template. Codes must be unique.
    pub fn insert(&mut self, template: Template) -> Result<()> {
        if let Some(existing) = self.templates.get(&template.code) {
            return Err(Error::definition(
                &template.source_path,
                format!(
                    "template '{}' is already defined in {}",
                    template.code,
                    existing.source_path.display()
                ),
            ));
        }
        self.templates.insert(template.code.clone(), template);
        Ok(())
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// Templates ordered by code.
    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    /// Exact lookup used to validate user supplied template codes.
    pub fn by_code(&self, code: &str) -> Result<&Template> {
        self.templates.get(code).ok_or_else(|| {
            let needle = code.to_lowercase();
            let similar = self
                .templates
                .keys()
                .filter(|k| {
                    let k = k.to_lowercase();
                    k.contains(&needle) || needle.contains(&k) || common_prefix(&k, &needle) >= 3
                })
                .cloned()
                .collect();
            Error::TemplateNotFound {
                code: code.to_string(),
                similar,
            }
        })
    }

    /// Templates declaring `version` of `package` compatible, narrowest
    /// matching range first. An empty result means "no recommendation".
    pub fn recommended_templates(&self, package: &str, version: &Version) -> Vec<&Template> {
        let mut matches: Vec<(&VersionRange, &Template)> = self
            .templates
            .values()
            .filter_map(|t| t.best_range(package, version).map(|r| (r, t)))
            .collect();
        matches.sort_by(|(ra, ta), (rb, tb)| {
            ra.cmp_specificity(rb).then_with(|| ta.code.cmp(&tb.code))
        });
        matches.into_iter().map(|(_, t)| t).collect()
    }

    /// Templates with at least one service whose dependency hints accept
    /// one of the locked package versions. A hint only, never a selection.
    pub fn suitable_templates(&self, locked: &BTreeMap<String, Version>) -> Vec<&Template> {
        self.templates.values().filter(|t| t.suits(locked)).collect()
    }
}

fn common_prefix(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}
