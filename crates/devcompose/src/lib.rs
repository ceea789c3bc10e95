// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! devcompose - Composition Engine for local development environments
//!
//! This crate assembles docker compose documents from reusable templates and
//! a constrained set of interchangeable service variants, then runs an ordered
//! pipeline of environment-specific modifiers before writing the result to disk.
//!
//! # Overview
//!
//! A template names service groups (`php`, `database`, `cache`, ...). Every
//! required group contributes exactly one variant and every optional group at
//! most one. Each variant carries a compose fragment and the parameters it
//! reads; parameters are resolved once and broadcast to every declaration so
//! independently authored fragments stay consistent.
//!
//! # Example
//!
//! ```yaml
//! # .devcompose.yaml
//! api: devcompose/v0
//! template: php_mysql
//!
//! services:
//!   - database=mariadb_10_4_persistent
//! optional:
//!   - cache=redis_6_0
//!
//! domains:
//!   - shop.local
//!   - www.shop.local
//!
//! includes:
//!   - ~/.config/devcompose/credentials.yaml
//! ```

pub mod assemble;
pub mod build;
pub mod catalog;
pub mod compose;
pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod manifest;
pub mod materialize;
pub mod modifier;
pub mod node;
pub mod parameter;
pub mod resolve;
pub mod selection;
pub mod spec;
pub mod template;
pub mod version;

#[cfg(test)]
pub(crate) mod fixtures;

pub use assemble::{Assembler, Assembly, CompositionDocument, DocumentKind};
pub use build::{BuildOutput, BuildRequest, CompositionBuilder, PreparedBuild};
pub use catalog::{ServiceCatalog, ServiceKind, ServiceVariant, VariantId};
pub use compose::{ComposedProject, compose_specs};
pub use config::EngineConfig;
pub use context::{ModificationContext, ReadmeBuffer};
pub use discovery::{DiscoveredProject, discover_project};
pub use error::{Error, Result};
pub use manifest::{BuildManifest, ManifestChange, ManifestChangeKind, verify_manifest};
pub use materialize::{Materialized, MaterializedFile, Materializer};
pub use modifier::{Modifier, Pipeline};
pub use node::{Node, Scalar};
pub use parameter::{Declaration, Parameter, ParameterStore};
pub use resolve::{HeadlessResolver, ParameterResolver, PresetResolver, resolve_parameters};
pub use selection::{
    HeadlessSelector, Selection, SelectionResolver, Selector, ServiceChoice, parse_choices,
};
pub use spec::{ApiVersion, ProjectSpec, validate_domains};
pub use template::{Runner, ServiceGroup, Template, TemplateRegistry};
pub use version::{Version, VersionRange};

/// Well-known filename for project files.
pub const PROJECT_FILENAME: &str = ".devcompose.yaml";

/// Well-known filename for local, uncommitted overrides.
pub const PROJECT_LOCAL_FILENAME: &str = ".devcompose.local.yaml";

/// Well-known filename for the build manifest written next to the outputs.
pub const MANIFEST_FILENAME: &str = ".devcompose.manifest.yaml";
