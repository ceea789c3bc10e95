// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! devcompose - docker compose environments from templates

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use devcompose::discovery::DiscoveryOptions;
use devcompose::{ComposedProject, DiscoveredProject, EngineConfig, TemplateRegistry};
use miette::Result;

mod args;
mod cmd_build;
mod cmd_check;
mod cmd_init;
mod cmd_show;
mod cmd_templates;
mod prompt;

use cmd_build::CmdBuild;
use cmd_check::CmdCheck;
use cmd_init::CmdInit;
use cmd_show::CmdShow;
use cmd_templates::CmdTemplates;

#[derive(Parser)]
#[clap(
    name = "devcompose",
    about = "Composition engine for local docker compose environments",
    version,
    long_about = "Assemble docker compose documents from reusable templates and interchangeable service variants"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

/// Where configuration, definitions and the project come from.
#[derive(Parser, Clone, Debug, Default)]
pub struct ProjectFlags {
    /// Start project discovery from PATH
    #[clap(short = 'f', long, default_value = ".")]
    pub file: PathBuf,

    /// Additional .devcompose.yaml to include
    #[clap(short = 'i', long = "include")]
    pub includes: Vec<String>,

    /// Configuration file (default: the user configuration directory)
    #[clap(long, env = "DEVCOMPOSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root of the template and service definitions
    #[clap(long, env = "DEVCOMPOSE_DEFINITIONS")]
    pub definitions: Option<PathBuf>,
}

impl ProjectFlags {
    pub fn load_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.definitions {
            config.definitions_dir = Some(dir.clone());
        }
        Ok(config)
    }

    pub fn load_registry(&self, config: &EngineConfig) -> Result<TemplateRegistry> {
        let dir = config.definitions_dir().ok_or_else(|| {
            miette::miette!(
                help = "Pass --definitions or set definitions_dir in the configuration",
                "No definitions directory configured"
            )
        })?;
        Ok(TemplateRegistry::load(&dir)?)
    }

    /// The enclosing project, if there is one.
    pub fn discover(&self) -> Result<Option<DiscoveredProject>> {
        let env_includes = std::env::var("DEVCOMPOSE_INCLUDE")
            .ok()
            .map(|s| s.split(':').filter(|p| !p.is_empty()).map(String::from).collect())
            .unwrap_or_default();
        let options = DiscoveryOptions {
            cli_includes: self.includes.clone(),
            env_includes,
        };
        match devcompose::discover_project(&self.file, &options) {
            Ok(project) => Ok(Some(project)),
            Err(devcompose::Error::NotFoundInTree(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// The composed project request plus its root.
    pub fn compose(&self) -> Result<(PathBuf, ComposedProject)> {
        match self.discover()? {
            Some(project) => Ok((project.root, devcompose::compose_specs(&project.specs))),
            None => {
                let root = std::path::absolute(&self.file)
                    .map_err(|e| miette::miette!("Failed to resolve {:?}: {e}", self.file))?;
                Ok((root, ComposedProject::default()))
            }
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a new .devcompose.yaml file
    Init(CmdInit),

    /// List templates and recommendations
    Templates(CmdTemplates),

    /// Display the resolved project request
    Show(CmdShow),

    /// Assemble and write the composition
    Build(CmdBuild),

    /// Verify generated files match the build manifest
    Check(CmdCheck),
}

impl Opt {
    fn run(self) -> Result<i32> {
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        match self.cmd {
            Command::Init(mut cmd) => cmd.run(),
            Command::Templates(mut cmd) => cmd.run(),
            Command::Show(mut cmd) => cmd.run(),
            Command::Build(mut cmd) => cmd.run(),
            Command::Check(mut cmd) => cmd.run(),
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}
