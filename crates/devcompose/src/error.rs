// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for devcompose operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with devcompose Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading definitions or building a composition.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// No .devcompose.yaml found in directory tree
    #[error("No .devcompose.yaml found in {0:?} or any parent directory")]
    #[diagnostic(
        code(devcompose::not_found_in_tree),
        help("Create a .devcompose.yaml file with 'devcompose init' or pass --template")
    )]
    NotFoundInTree(PathBuf),

    /// Invalid YAML in a definition, project or manifest file
    #[error("Invalid YAML in {path:?}: {error}")]
    #[diagnostic(
        code(devcompose::invalid_yaml),
        help("Check YAML syntax and ensure 'api: devcompose/v0' is present")
    )]
    InvalidYaml {
        path: Option<PathBuf>,
        #[source]
        error: serde_yaml::Error,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(devcompose::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Include file not found
    #[error("Include file not found: {path:?}")]
    #[diagnostic(
        code(devcompose::include_not_found),
        help("Check that the include path is correct and the file exists")
    )]
    IncludeNotFound {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Circular include detected
    #[error("Circular include detected: {0:?}")]
    #[diagnostic(
        code(devcompose::circular_include),
        help("Remove the circular reference in your includes")
    )]
    CircularInclude(PathBuf),

    /// Validation error
    #[error("Validation failed: {0}")]
    #[diagnostic(code(devcompose::validation_failed))]
    ValidationFailed(String),

    /// Malformed template or service definition
    #[error("Invalid definition {path:?}: {reason}")]
    #[diagnostic(
        code(devcompose::invalid_definition),
        help("Template and service definitions are validated at load time, fix the file and retry")
    )]
    InvalidDefinition { path: PathBuf, reason: String },

    /// Unknown template code
    #[error("Unknown template: {code}")]
    #[diagnostic(
        code(devcompose::template_not_found),
        help("{}", suggestion_message(similar))
    )]
    TemplateNotFound { code: String, similar: Vec<String> },

    /// Selection names a group the template does not declare
    #[error("Template '{template}' has no service group '{group}'")]
    #[diagnostic(code(devcompose::unknown_group), help("Available groups: {}", available.join(", ")))]
    UnknownGroup {
        template: String,
        group: String,
        available: Vec<String>,
    },

    /// Selection names a variant that is not part of the group
    #[error("Unknown service '{code}' in group '{group}'")]
    #[diagnostic(code(devcompose::unknown_variant), help("Available services: {}", available.join(", ")))]
    UnknownVariant {
        group: String,
        code: String,
        available: Vec<String>,
    },

    /// A bare service code matches variants in several groups
    #[error("Service '{code}' is ambiguous, it exists in groups: {}", .groups.join(", "))]
    #[diagnostic(
        code(devcompose::ambiguous_variant),
        help(
            "Qualify the service with its group, e.g. '{}={}'",
            groups.first().map(String::as_str).unwrap_or("group"),
            code
        )
    )]
    AmbiguousVariant { code: String, groups: Vec<String> },

    /// Two different variants were selected for one group
    #[error("Group '{group}' already has '{existing}' selected, cannot also select '{requested}'")]
    #[diagnostic(code(devcompose::duplicate_selection))]
    DuplicateSelection {
        group: String,
        existing: String,
        requested: String,
    },

    /// Required groups are still unresolved
    #[error("Template '{template}' requires a selection for: {}", .groups.join(", "))]
    #[diagnostic(
        code(devcompose::missing_selection),
        help("Pass the services explicitly, e.g. --services group=service")
    )]
    MissingSelection {
        template: String,
        groups: Vec<String>,
    },

    /// Parameter has no value and nothing could resolve it
    #[error("Parameter '{name}' has no value (declared by {sites})")]
    #[diagnostic(
        code(devcompose::missing_parameter),
        help("Pass it explicitly with --param {}=VALUE", name)
    )]
    MissingParameter { name: String, sites: String },

    /// Declarations disagree about a parameter's value
    #[error("Parameter '{name}' has conflicting values: {sites}")]
    #[diagnostic(
        code(devcompose::parameter_conflict),
        help("Set the value explicitly with --param {}=VALUE", name)
    )]
    ParameterConflict { name: String, sites: String },

    /// A placeholder survived substitution
    #[error("Unresolved placeholder '{{{{{name}}}}}' in {location}")]
    #[diagnostic(code(devcompose::unresolved_placeholder))]
    UnresolvedPlaceholder { name: String, location: String },

    /// Invalid version or version range
    #[error("Invalid version specification: {0}")]
    #[diagnostic(code(devcompose::invalid_version))]
    InvalidVersion(String),

    /// Modifier aborted the pipeline
    #[error("Modifier '{modifier}' failed")]
    #[diagnostic(code(devcompose::modifier_failed))]
    ModifierFailed {
        modifier: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// External collaborator failed
    #[error("External tool '{tool}' failed: {message}")]
    #[diagnostic(
        code(devcompose::external_tool),
        help("Make sure '{}' is installed and available in PATH", tool)
    )]
    ExternalTool { tool: String, message: String },

    /// Writing the outputs failed
    #[error("Failed to write {path:?}")]
    #[diagnostic(
        code(devcompose::materialization_failed),
        help("Remove the target directory before retrying, it may hold partial output")
    )]
    MaterializationFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Configuration could not be loaded
    #[error(transparent)]
    #[diagnostic(code(devcompose::config))]
    Config(#[from] config::ConfigError),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(devcompose::io_error))]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn yaml(path: Option<&std::path::Path>, error: serde_yaml::Error) -> Self {
        Self::InvalidYaml {
            path: path.map(ToOwned::to_owned),
            error,
        }
    }

    pub(crate) fn definition<S: Into<String>>(path: &std::path::Path, reason: S) -> Self {
        Self::InvalidDefinition {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

fn suggestion_message(similar: &[String]) -> String {
    if similar.is_empty() {
        "Run 'devcompose templates' to list the available templates".to_string()
    } else {
        format!("Did you mean one of: {}?", similar.join(", "))
    }
}
