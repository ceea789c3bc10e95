// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `devcompose templates` command.

use std::collections::BTreeMap;

use clap::Args;
use colored::Colorize;
use devcompose::{Template, Version};
use miette::Result;

use crate::args::{parse_locked, parse_version};

/// List templates and recommendations
#[derive(Debug, Args)]
pub struct CmdTemplates {
    #[clap(flatten)]
    project: crate::ProjectFlags,

    /// Recommend templates compatible with this package
    #[clap(long, requires = "version")]
    package: Option<String>,

    /// Version of --package
    #[clap(long, value_parser = parse_version, requires = "package")]
    version: Option<Version>,

    /// Locked package version (package=version), repeatable
    #[clap(long, value_parser = parse_locked)]
    locked: Vec<(String, Version)>,
}

impl CmdTemplates {
    pub fn run(&mut self) -> Result<i32> {
        let config = self.project.load_config()?;
        let registry = self.project.load_registry(&config)?;

        if let (Some(package), Some(version)) = (&self.package, &self.version) {
            let recommended = registry.recommended_templates(package, version);
            println!(
                "{}",
                format!("Recommended for {package} {version}:").bold()
            );
            println!();
            print_templates(&recommended);
            if recommended.is_empty() {
                println!("Pick a template explicitly with 'devcompose build --template'");
            }
            return Ok(0);
        }

        if !self.locked.is_empty() {
            let locked: BTreeMap<String, Version> = self.locked.iter().cloned().collect();
            let suitable = registry.suitable_templates(&locked);
            println!("{}", "Suitable for the locked packages:".bold());
            println!();
            print_templates(&suitable);
            return Ok(0);
        }

        let templates: Vec<&Template> = registry.templates().collect();
        println!("{}", "Templates:".bold());
        println!();
        print_templates(&templates);
        println!();
        println!("Total: {} template(s)", templates.len());
        Ok(0)
    }
}

fn print_templates(templates: &[&Template]) {
    if templates.is_empty() {
        println!("  {}", "(none)".dimmed());
        return;
    }
    for template in templates {
        println!("  {}", template.code.green());
        if let Some(description) = &template.description {
            println!("     {}", description.dimmed());
        }
        let groups: Vec<String> = template
            .groups()
            .iter()
            .map(|g| format!("{} ({})", g.name, g.kind))
            .collect();
        println!("     groups: {}", groups.join(", "));
    }
}
