// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `devcompose show` command.

use clap::Args;
use colored::Colorize;
use devcompose::{ComposedProject, ServiceKind, TemplateRegistry};
use miette::Result;

/// Display the resolved project request
#[derive(Debug, Args)]
pub struct CmdShow {
    #[clap(flatten)]
    project: crate::ProjectFlags,

    /// Show the template's groups and variants
    #[clap(long)]
    groups: bool,

    /// Output format: table, yaml
    #[clap(long, default_value = "table")]
    format: String,
}

impl CmdShow {
    pub fn run(&mut self) -> Result<i32> {
        let Some(project) = self.project.discover()? else {
            return Err(miette::miette!(
                help = "Create one with 'devcompose init'",
                "No {} found from {:?}",
                devcompose::PROJECT_FILENAME,
                self.project.file
            ));
        };
        let composed = devcompose::compose_specs(&project.specs);

        if self.format == "yaml" {
            self.show_yaml(&composed)?;
            return Ok(0);
        }

        println!("{} {}", "Project root:".bold(), project.root.display());
        println!();
        println!("{}", "Discovered Files:".bold());
        println!();
        for (i, path) in composed.source_files.iter().enumerate() {
            println!("  {}. {}", i + 1, path.display().to_string().cyan());
        }
        println!();
        self.show_request(&composed);

        if self.groups {
            let config = self.project.load_config()?;
            let registry = self.project.load_registry(&config)?;
            println!();
            self.show_groups(&registry, &composed)?;
        }
        Ok(0)
    }

    fn show_request(&self, composed: &ComposedProject) {
        println!("{}", "Composed Request:".bold());
        println!();
        let template = composed.template.as_deref().unwrap_or("(not set)");
        println!("  template: {}", template.green());
        print_list("services", &composed.services);
        print_list("optional", &composed.optional);
        print_list("domains", &composed.domains);
        if !composed.parameters.is_empty() {
            println!("  parameters:");
            for (name, value) in &composed.parameters {
                let shown = if devcompose::parameter::is_secret_name(name) {
                    "********".to_string()
                } else {
                    value.clone()
                };
                println!("    {} = {}", name.cyan(), shown);
            }
        }
        if let Some(target) = &composed.target {
            println!("  target: {}", target.display());
        }
    }

    fn show_groups(&self, registry: &TemplateRegistry, composed: &ComposedProject) -> Result<()> {
        let Some(code) = &composed.template else {
            println!("  {}", "(no template selected)".dimmed());
            return Ok(());
        };
        let template = registry.by_code(code)?;
        println!("{}", format!("Template {}:", template.code).bold());
        println!();
        for group in template.groups() {
            let marker = match group.kind {
                ServiceKind::Required => "required".yellow(),
                ServiceKind::Optional => "optional".blue(),
            };
            println!("  {} [{}]", group.name.cyan(), marker);
            for variant in group.variants() {
                println!("    - {}", variant.id.code);
            }
        }
        for runner in template.runners() {
            println!("  runner {} -> {}", runner.name.green(), runner.service);
        }
        Ok(())
    }

    fn show_yaml(&self, composed: &ComposedProject) -> Result<()> {
        println!("# Discovered Files:");
        for path in &composed.source_files {
            println!("# - {}", path.display());
        }
        println!();

        let spec = devcompose::ProjectSpec {
            template: composed.template.clone(),
            services: composed.services.clone(),
            optional: composed.optional.clone(),
            domains: composed.domains.clone(),
            parameters: composed.parameters.clone(),
            target: composed.target.clone(),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&spec)
            .map_err(|e| miette::miette!("Failed to serialize the request: {e}"))?;
        print!("{yaml}");
        Ok(())
    }
}

fn print_list(key: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("  {key}:");
    for item in items {
        println!("    - {item}");
    }
}
