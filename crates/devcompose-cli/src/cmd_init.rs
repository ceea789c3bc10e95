// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `devcompose init` command.

use std::path::PathBuf;

use clap::Args;
use miette::Result;

#[cfg(test)]
#[path = "./cmd_init_test.rs"]
mod cmd_init_test;

/// Create a new .devcompose.yaml file
#[derive(Debug, Args)]
pub struct CmdInit {
    /// Directory to create file in
    #[clap(default_value = ".")]
    path: PathBuf,

    /// Template code
    #[clap(short, long)]
    template: Option<String>,

    /// Required service selection (group=code), repeatable
    #[clap(short = 's', long = "service")]
    services: Vec<String>,

    /// Optional service selection (group=code or group=), repeatable
    #[clap(short = 'o', long = "optional")]
    optional: Vec<String>,

    /// Domain routed to the composition, the first is the main domain
    #[clap(short = 'd', long = "domain")]
    domains: Vec<String>,
}

impl CmdInit {
    pub fn run(&mut self) -> Result<i32> {
        let spec_path = self.path.join(devcompose::PROJECT_FILENAME);

        if spec_path.exists() {
            return Err(miette::miette!(
                "{} already exists at {:?}",
                devcompose::PROJECT_FILENAME,
                spec_path
            ));
        }

        std::fs::write(&spec_path, self.render())
            .map_err(|e| miette::miette!("Failed to write {:?}: {}", spec_path, e))?;

        println!("Created {} at {:?}", devcompose::PROJECT_FILENAME, spec_path);
        println!();
        println!("Next steps:");
        println!("  1. Run 'devcompose templates' to pick a template");
        println!("  2. Run 'devcompose show' to preview the request");
        println!("  3. Run 'devcompose build' to write the composition");

        Ok(0)
    }

    fn render(&self) -> String {
        let template = match &self.template {
            Some(code) => format!("template: {code}\n"),
            None => "# template: php_mysql\n".to_string(),
        };
        let services = list_section("services", &self.services, "database=mariadb_10_4_persistent");
        let optional = list_section("optional", &self.optional, "cache=redis_6_0");
        let domains = list_section("domains", &self.domains, "shop.local");

        format!(
            "# devcompose project file\n\
            \n\
            api: devcompose/v0\n\
            \n\
            # Template providing the service groups\n\
            {template}\
            \n\
            # One variant per required group (groups with a single variant are picked automatically)\n\
            {services}\
            \n\
            # At most one variant per optional group, 'group=' selects none\n\
            {optional}\
            \n\
            # Domains routed to the composition, the first one is the main domain\n\
            {domains}\
            \n\
            # Explicit parameter values\n\
            # parameters:\n\
            #   db_name: shop\n\
            \n\
            # Other project files loaded first, e.g. shared credentials\n\
            # includes:\n\
            #   - ~/.config/devcompose/credentials.yaml\n\
            \n\
            # Output directory relative to this file\n\
            # target: .devcompose/shop.local\n"
        )
    }
}

fn list_section(key: &str, items: &[String], example: &str) -> String {
    if items.is_empty() {
        return format!("# {key}:\n#   - {example}\n");
    }
    let entries: Vec<String> = items.iter().map(|i| format!("  - {i}")).collect();
    format!("{key}:\n{}\n", entries.join("\n"))
}
