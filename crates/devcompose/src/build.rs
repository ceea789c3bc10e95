// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! End to end orchestration of one composition build.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::assemble::{Assembler, DocumentKind};
use crate::config::EngineConfig;
use crate::context::ModificationContext;
use crate::manifest::BuildManifest;
use crate::materialize::{Materialized, Materializer};
use crate::modifier::Pipeline;
use crate::parameter::ParameterStore;
use crate::resolve::{ParameterResolver, resolve_parameters};
use crate::selection::{Selection, SelectionResolver, Selector, parse_choices};
use crate::spec::validate_domains;
use crate::template::{Template, TemplateRegistry};
use crate::Result;

#[cfg(test)]
#[path = "./build_test.rs"]
mod build_test;

/// Order of the README section describing the composition.
pub const OVERVIEW_SORT_ORDER: i32 = 0;

/// What to build.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub template: String,
    /// Required group choices, `group=code` or bare `code`.
    pub required: Vec<String>,
    /// Optional group choices, `group=code`, `group=` or bare `code`.
    pub optional: Vec<String>,
    /// Domains routed to the composition, main domain first.
    pub domains: Vec<String>,
    /// Explicit parameter values.
    pub parameters: BTreeMap<String, String>,
    /// Root relative host paths in fragments are resolved against.
    pub project_root: PathBuf,
    /// Output directory, relative to the project root unless absolute.
    pub target_dir: Option<PathBuf>,
    /// Ignore the values recorded by a previous build.
    pub fresh: bool,
}

/// Everything decided before any file is written.
#[derive(Debug, Clone)]
pub struct PreparedBuild {
    pub selection: Selection,
    pub parameters: ParameterStore,
    pub target_dir: PathBuf,
    pub context: ModificationContext,
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub selection: Selection,
    pub parameters: ParameterStore,
    pub target_dir: PathBuf,
    pub materialized: Materialized,
    pub manifest: BuildManifest,
    pub manifest_path: PathBuf,
}

/// Runs selection, parameter resolution, assembly, the modifier pipeline
/// and materialization for a [`BuildRequest`].
#[derive(Debug)]
pub struct CompositionBuilder<'a> {
    registry: &'a TemplateRegistry,
    config: &'a EngineConfig,
}

impl<'a> CompositionBuilder<'a> {
    pub fn new(registry: &'a TemplateRegistry, config: &'a EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Directory the outputs of `request` are written to.
    pub fn target_dir(&self, request: &BuildRequest, domains: &[String]) -> PathBuf {
        match &request.target_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => request.project_root.join(dir),
            None => {
                let name = domains.first().unwrap_or(&request.template);
                request
                    .project_root
                    .join(&self.config.target_dir_name)
                    .join(name)
            }
        }
    }

    /// Select, resolve and assemble without touching the disk.
    pub fn prepare(
        &self,
        request: &BuildRequest,
        selector: &mut dyn SelectionResolver,
        resolver: &mut dyn ParameterResolver,
    ) -> Result<PreparedBuild> {
        validate_domains(&request.domains)?;
        let template = self.registry.by_code(&request.template)?;
        let selection = select(template, request, selector)?;

        let provisional_target = self.target_dir(request, &request.domains);
        let previous = if request.fresh {
            None
        } else {
            BuildManifest::load(&provisional_target)?
                .filter(|manifest| manifest.template == template.code)
        };

        let domains = match (&previous, request.domains.is_empty()) {
            (Some(manifest), true) => manifest.domains.clone(),
            _ => request.domains.clone(),
        };
        validate_domains(&domains)?;

        let mut parameters = ParameterStore::from_selection(&selection);
        parameters.seed_domains(&domains);
        for (name, value) in &request.parameters {
            parameters.set(name, value.as_str());
        }
        if let Some(manifest) = &previous {
            let mut reused = 0;
            for (name, value) in &manifest.parameters {
                if parameters.suggest(name, value.as_str()) {
                    reused += 1;
                }
            }
            tracing::debug!(reused, "reused parameters of the previous build");
        }
        resolve_parameters(&mut parameters, resolver)?;

        let assembly = Assembler::new(&selection, &parameters).assemble()?;
        let target_dir = self.target_dir(request, &domains);
        let mut context = ModificationContext::new(assembly, &request.project_root, &target_dir)
            .with_domains(domains)
            .with_credentials(parameters.credential_values());
        context
            .readme
            .set_section(OVERVIEW_SORT_ORDER, "Overview", overview(template, &selection));

        Ok(PreparedBuild {
            selection,
            parameters,
            target_dir,
            context,
        })
    }

    /// Build and write the composition described by `request`.
    pub fn build(
        &self,
        request: &BuildRequest,
        selector: &mut dyn SelectionResolver,
        resolver: &mut dyn ParameterResolver,
    ) -> Result<BuildOutput> {
        let PreparedBuild {
            selection,
            parameters,
            target_dir,
            mut context,
        } = self.prepare(request, selector, resolver)?;

        std::fs::create_dir_all(&target_dir)?;
        let mut pipeline = Pipeline::with_defaults(self.config);
        tracing::debug!(?pipeline, "running modifiers");
        pipeline.run(&mut context)?;

        let materialized = Materializer::new(&target_dir).materialize(&context)?;

        let mut manifest = BuildManifest::new(selection.template());
        manifest.services = selection.ids().iter().map(ToString::to_string).collect();
        manifest.domains = context.domains.clone();
        manifest.parameters = parameters.values();
        manifest.record_outputs(&materialized);
        let manifest_path = manifest.save(&target_dir)?;

        tracing::info!(
            template = %selection.template(),
            target_dir = %target_dir.display(),
            "composition built"
        );
        Ok(BuildOutput {
            selection,
            parameters,
            target_dir,
            materialized,
            manifest,
            manifest_path,
        })
    }
}

fn select(
    template: &Template,
    request: &BuildRequest,
    resolver: &mut dyn SelectionResolver,
) -> Result<Selection> {
    let mut selector = Selector::new(template);
    selector.select_all(&parse_choices(&request.required)?)?;
    selector.select_all(&parse_choices(&request.optional)?)?;
    selector.resolve_with(resolver)?;
    selector.finish()
}

fn overview(template: &Template, selection: &Selection) -> String {
    let mut body = match &template.description {
        Some(description) => format!("Template `{}`: {}\n\n", template.code, description.trim()),
        None => format!("Template `{}`.\n\n", template.code),
    };
    body.push_str("Services:\n\n");
    for selected in selection.variants() {
        let _ = writeln!(body, "- `{}` ({})", selected.id(), selected.kind);
    }
    if !template.runners().is_empty() {
        body.push_str("\nRunners:\n\n");
        for runner in template.runners() {
            let _ = writeln!(
                body,
                "- `{}`: `docker compose exec {} bash`",
                runner.name, runner.service
            );
        }
    }
    body.push_str("\nUsage:\n\n```shell\n");
    for kind in DocumentKind::ALL {
        let _ = writeln!(body, "docker compose -f {} up -d", kind.file_name());
    }
    body.push_str("```\n");
    body
}

/// `target_dir` relative to the project root when below it.
pub fn display_target(project_root: &Path, target_dir: &Path) -> String {
    target_dir
        .strip_prefix(project_root)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| target_dir.display().to_string())
}
