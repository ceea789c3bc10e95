// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Composition logic for merging multiple project files into one request.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::ProjectSpec;

#[cfg(test)]
#[path = "./compose_test.rs"]
mod compose_test;

/// Composed project settings from multiple specs.
#[derive(Debug, Clone, Default)]
pub struct ComposedProject {
    /// Template code (last spec wins if set).
    pub template: Option<String>,

    /// Required service selections, one per group (last spec wins per group).
    pub services: Vec<String>,

    /// Optional service selections, one per group (last spec wins per group).
    pub optional: Vec<String>,

    /// Domains (in order, without duplicates).
    pub domains: Vec<String>,

    /// Explicit parameter values (last spec wins per key).
    pub parameters: BTreeMap<String, String>,

    /// Output directory relative to the project root (last spec wins if set).
    pub target: Option<PathBuf>,

    /// Source files that contributed to this composition.
    pub source_files: Vec<PathBuf>,
}

impl ComposedProject {
    /// Create a new empty composed project.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of source files.
    pub fn source_count(&self) -> usize {
        self.source_files.len()
    }
}

fn extend_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

/// Merge selections so each group keeps only its latest choice.
///
/// Entries may hold several space or comma separated choices. Bare codes
/// have no known group and are keyed by the code itself.
fn override_by_group(target: &mut Vec<String>, items: &[String]) {
    let tokens = items
        .iter()
        .flat_map(|item| item.split([',', ' ', '\t', '\n']))
        .filter(|token| !token.is_empty());
    for token in tokens {
        let key = selection_key(token);
        match target.iter().position(|t| selection_key(t) == key) {
            Some(index) => target[index] = token.to_string(),
            None => target.push(token.to_string()),
        }
    }
}

fn selection_key(choice: &str) -> &str {
    choice.split_once('=').map_or(choice, |(group, _)| group.trim())
}

/// Compose multiple specs into a single project request.
///
/// Specs are processed in order, later specs override earlier ones.
pub fn compose_specs(specs: &[ProjectSpec]) -> ComposedProject {
    let mut composed = ComposedProject::default();

    for spec in specs {
        if spec.template.is_some() {
            composed.template = spec.template.clone();
        }
        if spec.target.is_some() {
            composed.target = spec.target.clone();
        }

        override_by_group(&mut composed.services, &spec.services);
        override_by_group(&mut composed.optional, &spec.optional);
        extend_unique(&mut composed.domains, &spec.domains);

        composed.parameters.extend(
            spec.parameters
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        // Track source file
        if let Some(path) = &spec.source_path {
            composed.source_files.push(path.clone());
        }
    }

    composed
}
