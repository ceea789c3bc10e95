// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Service group selection.
//!
//! Every required group of a template ends up with exactly one variant and
//! every optional group with at most one. Required groups offering a single
//! variant are selected up front, the remaining gaps are filled through a
//! [`SelectionResolver`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::catalog::{ServiceKind, ServiceVariant, VariantId};
use crate::template::{ServiceGroup, Template};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./selection_test.rs"]
mod selection_test;

/// One user supplied selection: `group=code`, `group=` or a bare `code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceChoice {
    pub group: Option<String>,
    pub code: Option<String>,
}

impl ServiceChoice {
    pub fn new<G: Into<String>, C: Into<String>>(group: G, code: C) -> Self {
        Self {
            group: Some(group.into()),
            code: Some(code.into()),
        }
    }

    /// Explicitly select nothing for an optional group.
    pub fn none<G: Into<String>>(group: G) -> Self {
        Self {
            group: Some(group.into()),
            code: None,
        }
    }
}

impl FromStr for ServiceChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (group, code) = match s.split_once('=') {
            Some((group, code)) => (Some(group.trim()), code.trim()),
            None => (None, s),
        };
        if group.is_some_and(str::is_empty) || (group.is_none() && code.is_empty()) {
            return Err(Error::ValidationFailed(format!(
                "invalid service selection '{s}', expected group=service"
            )));
        }
        Ok(Self {
            group: group.map(String::from),
            code: (!code.is_empty()).then(|| code.to_string()),
        })
    }
}

impl fmt::Display for ServiceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.group, &self.code) {
            (Some(group), Some(code)) => write!(f, "{group}={code}"),
            (Some(group), None) => write!(f, "{group}="),
            (None, Some(code)) => f.write_str(code),
            (None, None) => Ok(()),
        }
    }
}

/// Parse selections given as space and/or comma separated lists.
pub fn parse_choices<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<ServiceChoice>> {
    inputs
        .iter()
        .flat_map(|input| {
            input
                .as_ref()
                .split([',', ' ', '\t', '\n'])
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .map(|token| token.parse())
        .collect()
}

/// Supplies a variant for a required group that has no selection yet.
///
/// Returning `None` leaves the group unresolved, which fails the build.
pub trait SelectionResolver {
    fn choose(&mut self, template: &Template, group: &ServiceGroup) -> Result<Option<String>>;
}

impl<F> SelectionResolver for F
where
    F: FnMut(&Template, &ServiceGroup) -> Result<Option<String>>,
{
    fn choose(&mut self, template: &Template, group: &ServiceGroup) -> Result<Option<String>> {
        self(template, group)
    }
}

/// Non-interactive resolver: never picks anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessSelector;

impl SelectionResolver for HeadlessSelector {
    fn choose(&mut self, _template: &Template, _group: &ServiceGroup) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Accumulates choices for one template.
#[derive(Debug)]
pub struct Selector<'a> {
    template: &'a Template,
    /// Group -> chosen variant. `None` records an explicit empty selection.
    chosen: BTreeMap<String, Option<Arc<ServiceVariant>>>,
}

impl<'a> Selector<'a> {
    /// Start a selection, auto-selecting single-variant required groups.
    pub fn new(template: &'a Template) -> Self {
        let mut chosen = BTreeMap::new();
        for group in template.groups_of(ServiceKind::Required) {
            if let [only] = group.variants() {
                tracing::debug!(variant = %only.id, "auto-selected single variant");
                chosen.insert(group.name.clone(), Some(Arc::clone(only)));
            }
        }
        Self { template, chosen }
    }

    pub fn template(&self) -> &'a Template {
        self.template
    }

    /// Apply a list of choices in order.
    pub fn select_all(&mut self, choices: &[ServiceChoice]) -> Result<()> {
        choices.iter().try_for_each(|choice| self.select(choice))
    }

    /// Apply one choice, rejecting unknown groups and variants.
    pub fn select(&mut self, choice: &ServiceChoice) -> Result<()> {
        let group = self.locate_group(choice)?;
        let variant = match &choice.code {
            Some(code) => Some(Arc::clone(group.variant(code).ok_or_else(|| {
                Error::UnknownVariant {
                    group: group.name.clone(),
                    code: code.clone(),
                    available: group.codes(),
                }
            })?)),
            None if group.kind == ServiceKind::Required => {
                return Err(Error::ValidationFailed(format!(
                    "required group '{}' cannot be left empty",
                    group.name
                )));
            }
            None => None,
        };

        if let Some(existing) = self.chosen.get(&group.name) {
            let same = match (existing, &variant) {
                (Some(a), Some(b)) => a.id == b.id,
                (None, None) => true,
                _ => false,
            };
            if same {
                return Ok(());
            }
            return Err(Error::DuplicateSelection {
                group: group.name.clone(),
                existing: describe(existing),
                requested: describe(&variant),
            });
        }

        tracing::debug!(group = %group.name, selection = %describe(&variant), "selected service");
        self.chosen.insert(group.name.clone(), variant);
        Ok(())
    }

    /// Select `code` in `group`.
    pub fn choose(&mut self, group: &str, code: &str) -> Result<()> {
        self.select(&ServiceChoice::new(group, code))
    }

    /// Required groups still lacking a variant, in template order.
    pub fn missing_required(&self) -> Vec<&'a ServiceGroup> {
        self.template
            .groups_of(ServiceKind::Required)
            .filter(|g| !self.chosen.contains_key(&g.name))
            .collect()
    }

    /// Ask `resolver` for every required group that is still open.
    pub fn resolve_with(&mut self, resolver: &mut dyn SelectionResolver) -> Result<()> {
        for group in self.missing_required() {
            if let Some(code) = resolver.choose(self.template, group)? {
                self.choose(&group.name, &code)?;
            }
        }
        Ok(())
    }

    /// Freeze the selection. Fails while a required group is open.
    pub fn finish(self) -> Result<Selection> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(Error::MissingSelection {
                template: self.template.code.clone(),
                groups: missing.iter().map(|g| g.name.clone()).collect(),
            });
        }

        let mut variants = Vec::new();
        for group in self.template.groups() {
            if let Some(Some(variant)) = self.chosen.get(&group.name) {
                variants.push(SelectedVariant {
                    kind: group.kind,
                    variant: Arc::clone(variant),
                });
            }
        }
        Ok(Selection {
            template: self.template.code.clone(),
            variants,
        })
    }

    fn locate_group(&self, choice: &ServiceChoice) -> Result<&'a ServiceGroup> {
        let template = self.template;
        if let Some(name) = &choice.group {
            return template.group(name).ok_or_else(|| Error::UnknownGroup {
                template: template.code.clone(),
                group: name.clone(),
                available: template.group_names(),
            });
        }

        let code = choice.code.as_deref().unwrap_or_default();
        let matches: Vec<&ServiceGroup> = template
            .groups()
            .iter()
            .filter(|g| g.variant(code).is_some())
            .collect();
        match matches.as_slice() {
            [group] => Ok(*group),
            [] => Err(Error::UnknownVariant {
                group: "*".to_string(),
                code: code.to_string(),
                available: template
                    .groups()
                    .iter()
                    .flat_map(|g| g.variants().iter().map(|v| v.id.to_string()))
                    .collect(),
            }),
            _ => Err(Error::AmbiguousVariant {
                code: code.to_string(),
                groups: matches.iter().map(|g| g.name.clone()).collect(),
            }),
        }
    }
}

fn describe(variant: &Option<Arc<ServiceVariant>>) -> String {
    match variant {
        Some(v) => v.id.code.clone(),
        None => "<none>".to_string(),
    }
}

/// A variant chosen for one group of the template.
#[derive(Debug, Clone)]
pub struct SelectedVariant {
    pub kind: ServiceKind,
    pub variant: Arc<ServiceVariant>,
}

impl SelectedVariant {
    pub fn id(&self) -> &VariantId {
        &self.variant.id
    }
}

/// Finished selection, in group declaration order.
#[derive(Debug, Clone)]
pub struct Selection {
    template: String,
    variants: Vec<SelectedVariant>,
}

impl Selection {
    /// Code of the template this selection was made for.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn variants(&self) -> &[SelectedVariant] {
        &self.variants
    }

    pub fn get(&self, group: &str) -> Option<&SelectedVariant> {
        self.variants.iter().find(|s| s.variant.id.group == group)
    }

    pub fn ids(&self) -> Vec<VariantId> {
        self.variants.iter().map(|s| s.variant.id.clone()).collect()
    }
}
