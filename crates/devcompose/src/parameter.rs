// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Parameter store: one value per name, plus the index of who declared it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::catalog::VariantId;
use crate::selection::Selection;

#[cfg(test)]
#[path = "./parameter_test.rs"]
mod parameter_test;

/// A service variant reading a parameter, and the default it ships with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub variant: VariantId,
    pub source: PathBuf,
    pub raw: Option<String>,
}

/// A named value shared by every variant that declares it.
#[derive(Debug, Clone, Default)]
pub struct Parameter {
    pub name: String,
    pub value: Option<String>,
    /// Set by the user or derived from the domain set, never overridden by defaults.
    pub explicit: bool,
    pub declarations: Vec<Declaration>,
}

impl Parameter {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn is_secret(&self) -> bool {
        is_secret_name(&self.name)
    }

    /// Distinct concrete defaults among the declarations.
    pub fn defaults(&self) -> BTreeSet<&str> {
        self.declarations
            .iter()
            .filter_map(|d| d.raw.as_deref())
            .collect()
    }

    /// Human readable list of declaration sites.
    pub fn sites(&self) -> String {
        if self.declarations.is_empty() {
            return "no service".to_string();
        }
        self.declarations
            .iter()
            .map(|d| match &d.raw {
                Some(raw) => format!("{} ({}) = '{}'", d.variant, d.source.display(), raw),
                None => format!("{} ({})", d.variant, d.source.display()),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Names that hold secrets: `*_password`, `*_secret` or `password`.
pub fn is_secret_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "password" || name.ends_with("_password") || name.ends_with("_secret")
}

/// Per-composition parameter values and their declaration index.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    params: BTreeMap<String, Parameter>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every parameter of every selected variant.
    pub fn from_selection(selection: &Selection) -> Self {
        let mut store = Self::new();
        for selected in selection.variants() {
            let variant = &selected.variant;
            for (name, raw) in &variant.parameters {
                store.declare(
                    name,
                    Declaration {
                        variant: variant.id.clone(),
                        source: variant.source_path.clone(),
                        raw: raw.clone(),
                    },
                );
            }
        }
        store
    }

    pub fn declare(&mut self, name: &str, declaration: Declaration) {
        self.params
            .entry(name.to_string())
            .or_insert_with(|| Parameter::new(name))
            .declarations
            .push(declaration);
    }

    /// Set an explicit value. Explicit values win over every default.
    pub fn set<S: Into<String>>(&mut self, name: &str, value: S) {
        let param = self
            .params
            .entry(name.to_string())
            .or_insert_with(|| Parameter::new(name));
        param.value = Some(value.into());
        param.explicit = true;
    }

    /// Set an explicit value only for a declared parameter nobody set yet.
    pub fn suggest<S: Into<String>>(&mut self, name: &str, value: S) -> bool {
        match self.params.get_mut(name) {
            Some(param) if !param.explicit && !param.declarations.is_empty() => {
                param.value = Some(value.into());
                param.explicit = true;
                true
            }
            _ => false,
        }
    }

    /// Store a resolved value for `name`, shared by all its declarations.
    pub fn assign<S: Into<String>>(&mut self, name: &str, value: S) {
        self.params
            .entry(name.to_string())
            .or_insert_with(|| Parameter::new(name))
            .value = Some(value.into());
    }

    /// Derive the routing parameters from a domain set.
    ///
    /// The first domain is the main domain, the rest are aliases.
    pub fn seed_domains(&mut self, domains: &[String]) {
        let Some(main) = domains.first() else {
            return;
        };
        let rule = domains
            .iter()
            .map(|d| format!("Host(`{d}`)"))
            .collect::<Vec<_>>()
            .join(" || ");
        self.set("domains", domains.join(" "));
        self.set("main_domain", main.as_str());
        self.set("main_domain_slug", main.replace('.', "-"));
        self.set("domain_aliases", domains[1..].join(" "));
        self.set("traefik_rule", rule);
    }

    /// Give every unset parameter its declared default when all
    /// declarations agree on it.
    pub fn settle_defaults(&mut self) {
        for param in self.params.values_mut() {
            if param.explicit || param.value.is_some() {
                continue;
            }
            let settled = {
                let defaults = param.defaults();
                match defaults.len() {
                    1 => defaults.into_iter().next().map(String::from),
                    _ => None,
                }
            };
            if settled.is_some() {
                param.value = settled;
            }
        }
    }

    /// Parameters whose declarations carry differing defaults with no
    /// explicit value to settle them.
    pub fn conflicts(&self) -> Vec<&Parameter> {
        self.params
            .values()
            .filter(|p| !p.explicit && p.defaults().len() > 1)
            .collect()
    }

    /// Parameters with no value yet. Secrets left empty count as missing.
    pub fn missing(&self) -> Vec<&Parameter> {
        self.params
            .values()
            .filter(|p| match p.value.as_deref() {
                None => true,
                Some("") => p.is_secret(),
                Some(_) => false,
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(|p| p.value.as_deref())
    }

    /// The value `variant` sees for `name`, if it declares the parameter.
    pub fn effective_value(&self, name: &str, variant: &VariantId) -> Option<&str> {
        let param = self.params.get(name)?;
        if param.declarations.iter().any(|d| &d.variant == variant) {
            param.value.as_deref()
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    /// Every resolved value, keyed by name.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.params
            .values()
            .filter_map(|p| p.value.as_ref().map(|v| (p.name.clone(), v.clone())))
            .collect()
    }

    /// Resolved values of secret parameters.
    pub fn credential_values(&self) -> BTreeSet<String> {
        self.params
            .values()
            .filter(|p| p.is_secret())
            .filter_map(|p| p.value.clone())
            .filter(|v| !v.is_empty())
            .collect()
    }
}
