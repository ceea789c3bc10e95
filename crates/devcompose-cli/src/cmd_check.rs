// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Verify that generated files still match the build manifest.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use devcompose::{BuildManifest, BuildRequest, CompositionBuilder, ManifestChangeKind, TemplateRegistry};
use miette::Result;

/// Verify generated files match the build manifest
#[derive(Debug, Args)]
pub struct CmdCheck {
    #[clap(flatten)]
    project: crate::ProjectFlags,

    /// Target directory (default: derived from the project file)
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Exit with error on mismatch
    #[clap(long)]
    strict: bool,
}

impl CmdCheck {
    pub fn run(&mut self) -> Result<i32> {
        let target_dir = self.target_dir()?;

        let Some(manifest) = BuildManifest::load(&target_dir)? else {
            let path = BuildManifest::path_in(&target_dir);
            if self.strict {
                return Err(miette::miette!("No build manifest found at {:?}", path));
            }
            println!("Warning: No build manifest found at {:?}", path);
            return Ok(2);
        };

        let changes = manifest.verify(&target_dir)?;
        if changes.is_empty() {
            println!(
                "{} Generated files match the manifest ({} built {})",
                "✓".green(),
                manifest.template,
                manifest.generated.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            );
            return Ok(0);
        }

        if self.strict {
            eprintln!("Error: Generated files differ from the manifest:");
        } else {
            println!("Warning: Generated files differ from the manifest:");
        }
        for change in &changes {
            match change.kind {
                ManifestChangeKind::OutputChanged => {
                    println!("  - {} was modified", change.file.yellow());
                    if let Some(actual) = &change.actual {
                        println!("    Expected: {}", change.expected);
                        println!("    Actual:   {}", actual);
                    }
                }
                ManifestChangeKind::OutputMissing => {
                    println!("  - {} is missing", change.file.red());
                }
            }
        }

        if self.strict {
            return Ok(1);
        }

        println!("\nRun 'devcompose build' to regenerate the files");
        Ok(0)
    }

    fn target_dir(&self) -> Result<PathBuf> {
        let (project_root, composed) = self.project.compose()?;
        if let Some(output) = &self.output {
            return Ok(project_root.join(output));
        }
        let config = self.project.load_config()?;
        let template = composed.template.ok_or_else(|| {
            miette::miette!(
                help = "Pass --output with the directory to check",
                "No template in the project file to derive the target directory from"
            )
        })?;
        let request = BuildRequest {
            template,
            domains: composed.domains,
            project_root,
            target_dir: composed.target,
            ..Default::default()
        };
        let registry = TemplateRegistry::default();
        Ok(CompositionBuilder::new(&registry, &config).target_dir(&request, &request.domains))
    }
}
