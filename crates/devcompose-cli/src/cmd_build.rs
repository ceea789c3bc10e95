// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `devcompose build` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use devcompose::build::display_target;
use devcompose::{
    BuildRequest, CompositionBuilder, HeadlessResolver, HeadlessSelector, ParameterResolver,
    SelectionResolver,
};
use miette::Result;

use crate::args::parse_key_value;
use crate::prompt::{PromptResolver, PromptSelector};

/// Assemble and write the composition
#[derive(Debug, Args)]
pub struct CmdBuild {
    #[clap(flatten)]
    project: crate::ProjectFlags,

    /// Template code (overrides the project file)
    #[clap(short, long)]
    template: Option<String>,

    /// Required services, space or comma separated group=code (replaces the project file's)
    #[clap(short = 's', long = "services")]
    services: Vec<String>,

    /// Optional services, group=code or group= for none (replaces the project file's)
    #[clap(long = "optional")]
    optional: Vec<String>,

    /// Domain routed to the composition, repeatable, the first is the main domain
    #[clap(short = 'd', long = "domain")]
    domains: Vec<String>,

    /// Parameter value (name=value), repeatable
    #[clap(short = 'p', long = "param", value_parser = parse_key_value)]
    params: Vec<(String, String)>,

    /// Output directory, relative to the project root
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Never prompt, fail on anything that would need an answer
    #[clap(long, env = "DEVCOMPOSE_NO_INTERACTION")]
    no_interaction: bool,

    /// Ignore parameter values recorded by the previous build
    #[clap(long)]
    fresh: bool,

    /// Print the assembled production document without writing anything
    #[clap(long)]
    dry_run: bool,
}

impl CmdBuild {
    pub fn run(&mut self) -> Result<i32> {
        let config = self.project.load_config()?;
        let registry = self.project.load_registry(&config)?;
        let request = self.request()?;

        let interactive = !self.no_interaction && console::user_attended();
        let (mut selector, mut resolver): (Box<dyn SelectionResolver>, Box<dyn ParameterResolver>) =
            if interactive {
                let term = console::Term::stderr();
                (
                    Box::new(PromptSelector::new(term.clone())),
                    Box::new(PromptResolver::new(term)),
                )
            } else {
                (Box::new(HeadlessSelector), Box::new(HeadlessResolver))
            };

        let builder = CompositionBuilder::new(&registry, &config);

        if self.dry_run {
            let prepared = builder.prepare(&request, selector.as_mut(), resolver.as_mut())?;
            print!("{}", prepared.context.production.to_yaml()?);
            return Ok(0);
        }

        let output = builder.build(&request, selector.as_mut(), resolver.as_mut())?;

        println!(
            "{} {} in {}",
            "Built".green().bold(),
            output.selection.template().bold(),
            display_target(&request.project_root, &output.target_dir).cyan()
        );
        println!();
        for id in output.selection.ids() {
            println!("  - {}", id);
        }
        println!();
        for file in &output.materialized.files {
            println!("  {}", file.path.display());
        }
        println!("  {}", output.manifest_path.display().to_string().dimmed());
        println!();
        println!("Start it with:");
        println!(
            "  docker compose -f {} up -d",
            output
                .target_dir
                .join(devcompose::DocumentKind::DevTools.file_name())
                .display()
        );
        Ok(0)
    }

    /// The project file request with the command line applied on top.
    fn request(&self) -> Result<BuildRequest> {
        let (project_root, composed) = self.project.compose()?;

        let template = self
            .template
            .clone()
            .or(composed.template)
            .ok_or_else(|| {
                miette::miette!(
                    help = "Pass --template or set 'template' in the project file, 'devcompose templates' lists them",
                    "No template selected"
                )
            })?;

        let mut parameters = composed.parameters;
        parameters.extend(self.params.iter().cloned());

        Ok(BuildRequest {
            template,
            required: pick(&self.services, composed.services),
            optional: pick(&self.optional, composed.optional),
            domains: pick(&self.domains, composed.domains),
            parameters,
            project_root,
            target_dir: self.output.clone().or(composed.target),
            fresh: self.fresh,
        })
    }
}

fn pick(cli: &[String], project: Vec<String>) -> Vec<String> {
    if cli.is_empty() { project } else { cli.to_vec() }
}
