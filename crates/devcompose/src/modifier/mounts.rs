// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use std::path::{Component, Path, PathBuf};

use super::Modifier;
use crate::context::ModificationContext;
use crate::node::Node;
use crate::Result;

#[cfg(test)]
#[path = "./mounts_test.rs"]
mod mounts_test;

/// Rewrites relative host paths so they resolve from the target directory.
///
/// Fragments are written as if the compose file lived in the project root.
/// Volumes (short and long syntax), `build` contexts and `env_file` entries
/// are rebased onto the directory the documents are written to.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountPaths;

impl MountPaths {
    pub const SORT_ORDER: i32 = 10;
}

impl Modifier for MountPaths {
    fn name(&self) -> &'static str {
        "mount-paths"
    }

    fn sort_order(&self) -> i32 {
        Self::SORT_ORDER
    }

    fn modify(&mut self, ctx: &mut ModificationContext) -> Result<()> {
        if !ctx.mark_applied(self.name()) {
            tracing::debug!("mount paths already rebased");
            return Ok(());
        }
        let project_root = normalize(&std::path::absolute(&ctx.project_root)?);
        let target_dir = normalize(&std::path::absolute(&ctx.target_dir)?);
        let rebase = |host: &str| -> Option<String> {
            if !is_relative_host_path(host) {
                return None;
            }
            let resolved = normalize(&project_root.join(host));
            Some(display_relative(&relative_path(&target_dir, &resolved)))
        };

        for doc in ctx.documents_mut() {
            let Some(services) = doc.services_mut() else {
                continue;
            };
            for service in services.values_mut() {
                rebase_service(service, &rebase);
            }
        }
        Ok(())
    }
}

fn rebase_service<F: Fn(&str) -> Option<String>>(service: &mut Node, rebase: &F) {
    if let Some(volumes) = service.get_mut("volumes").and_then(Node::as_list_mut) {
        for volume in volumes.iter_mut() {
            match volume {
                Node::Map(long) => {
                    if let Some(source) = long.get_mut("source") {
                        rewrite_text(source, rebase);
                    }
                }
                short => {
                    let Some(text) = short.as_str() else {
                        continue;
                    };
                    let (host, rest) = match text.split_once(':') {
                        Some((host, rest)) => (host, Some(rest)),
                        None => (text, None),
                    };
                    if let Some(host) = rebase(host) {
                        *short = Node::string(match rest {
                            Some(rest) => format!("{host}:{rest}"),
                            None => host,
                        });
                    }
                }
            }
        }
    }

    match service.get_mut("build") {
        Some(Node::Map(build)) => {
            if let Some(context) = build.get_mut("context") {
                rewrite_text(context, rebase);
            }
        }
        Some(context) => rewrite_text(context, rebase),
        None => {}
    }

    match service.get_mut("env_file") {
        Some(Node::List(files)) => files.iter_mut().for_each(|f| rewrite_text(f, rebase)),
        Some(file) => rewrite_text(file, rebase),
        None => {}
    }
}

fn rewrite_text<F: Fn(&str) -> Option<String>>(node: &mut Node, rebase: &F) {
    if let Some(rebased) = node.as_str().and_then(rebase) {
        *node = Node::string(rebased);
    }
}

fn is_relative_host_path(host: &str) -> bool {
    host == "." || host == ".." || host.starts_with("./") || host.starts_with("../")
}

/// Resolve `.` and `..` components without touching the file system.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Path of `to` relative to the directory `from`. Both must be normalized.
pub(crate) fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component.as_os_str());
    }
    out
}

/// Compose only treats a host path as a bind mount when it starts with a dot.
fn display_relative(path: &Path) -> String {
    let text = path.to_string_lossy();
    if text.is_empty() {
        ".".to_string()
    } else if text.starts_with("..") {
        text.into_owned()
    } else {
        format!("./{text}")
    }
}
