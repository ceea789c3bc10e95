// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Discovery algorithm for finding the project root and its .devcompose.yaml files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[cfg(test)]
#[path = "./discovery_test.rs"]
mod discovery_test;

use crate::{PROJECT_FILENAME, PROJECT_LOCAL_FILENAME, ProjectSpec};

/// Options for discovery behavior.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Additional includes from CLI (from --include flags).
    pub cli_includes: Vec<String>,

    /// Additional includes from environment (from DEVCOMPOSE_INCLUDE).
    pub env_includes: Vec<String>,
}

/// Project root plus every spec that applies to it, in composition order.
#[derive(Debug, Clone)]
pub struct DiscoveredProject {
    pub root: PathBuf,
    pub specs: Vec<ProjectSpec>,
}

/// Discover the project that contains `start_path`.
///
/// The nearest directory holding a .devcompose.yaml is the project root.
/// Specs are returned in composition order: CLI includes, environment
/// includes, the project file preceded by its own includes, then the local
/// override file.
pub fn discover_project<P: AsRef<Path>>(
    start_path: P,
    options: &DiscoveryOptions,
) -> crate::Result<DiscoveredProject> {
    let start = resolve_start_path(start_path.as_ref());
    let root = find_project_root(&start).ok_or_else(|| crate::Error::NotFoundInTree(start.clone()))?;

    let mut seen = HashSet::new();
    let mut specs = Vec::new();

    // Step 1: Process CLI includes
    for include_path in &options.cli_includes {
        specs.extend(load_with_includes(include_path, Some(&start), &mut seen)?);
    }

    // Step 2: Process environment variable includes
    for include_path in &options.env_includes {
        specs.extend(load_with_includes(include_path, Some(&start), &mut seen)?);
    }

    // Step 3: The project file and everything it includes
    let project_file = root.join(PROJECT_FILENAME);
    specs.extend(load_with_includes(
        &project_file.to_string_lossy(),
        None,
        &mut seen,
    )?);

    // Step 4: Load local override if it exists
    let local_path = root.join(PROJECT_LOCAL_FILENAME);
    if local_path.is_file() {
        specs.extend(load_with_includes(
            &local_path.to_string_lossy(),
            None,
            &mut seen,
        )?);
    }

    for spec in &specs {
        spec.validate()?;
    }

    tracing::debug!(root = %root.display(), files = specs.len(), "discovered project");
    Ok(DiscoveredProject { root, specs })
}

/// Resolve starting path, preferring $PWD to preserve symlinks.
fn resolve_start_path(start_path: &Path) -> PathBuf {
    if start_path.is_absolute() {
        start_path.to_owned()
    } else {
        match std::env::var("PWD").ok() {
            Some(pwd) => PathBuf::from(pwd).join(start_path),
            None => std::env::current_dir()
                .unwrap_or_default()
                .join(start_path),
        }
    }
}

/// Walk up from `start` to the nearest directory with a project file.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(PROJECT_FILENAME).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load a spec and, before it, every spec it includes (depth first).
fn load_with_includes(
    include_path: &str,
    base_dir: Option<&Path>,
    seen: &mut HashSet<PathBuf>,
) -> crate::Result<Vec<ProjectSpec>> {
    let path = resolve_include_path(include_path, base_dir)?;

    // Check for circular includes
    if !seen.insert(path.clone()) {
        return Err(crate::Error::CircularInclude(path));
    }

    let spec = ProjectSpec::load(&path)?;
    let mut result = Vec::new();
    let spec_dir = spec.base_dir().map(Path::to_path_buf);
    for nested in &spec.includes {
        result.extend(load_with_includes(nested, spec_dir.as_deref(), seen)?);
    }
    result.push(spec);
    Ok(result)
}

/// Resolve include path to absolute canonical path.
fn resolve_include_path(include: &str, base_dir: Option<&Path>) -> crate::Result<PathBuf> {
    let path = if include.starts_with('~') {
        // Home-relative
        let home = dirs::home_dir().ok_or_else(|| {
            crate::Error::ValidationFailed("Cannot resolve ~ without HOME".to_string())
        })?;
        let rel = include.strip_prefix("~/").unwrap_or(include);
        home.join(rel)
    } else if Path::new(include).is_absolute() {
        // Absolute
        PathBuf::from(include)
    } else {
        // Relative - need base_dir
        let base = base_dir.ok_or_else(|| {
            crate::Error::ValidationFailed(format!(
                "Cannot resolve relative include '{}' without base directory",
                include
            ))
        })?;
        base.join(include)
    };

    dunce::canonicalize(&path).map_err(|e| crate::Error::IncludeNotFound {
        path: path.clone(),
        error: e,
    })
}
