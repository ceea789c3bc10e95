// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Writing the final documents and README to the target directory.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::assemble::DocumentKind;
use crate::context::ModificationContext;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./materialize_test.rs"]
mod materialize_test;

/// File name of the generated README.
pub const README_FILENAME: &str = "README.md";

/// One file written by the [`Materializer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedFile {
    /// Name relative to the target directory.
    pub name: String,
    pub path: PathBuf,
    pub content: String,
}

/// Result of a successful materialization.
#[derive(Debug, Clone)]
pub struct Materialized {
    pub target_dir: PathBuf,
    pub files: Vec<MaterializedFile>,
    /// Side files staged by modifiers, such as certificate bookkeeping.
    /// They may live outside the target directory and are not part of the
    /// build manifest.
    pub staged: Vec<PathBuf>,
}

impl Materialized {
    pub fn file(&self, name: &str) -> Option<&MaterializedFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Serializes a [`ModificationContext`] into its target directory.
///
/// Every file is rendered before anything touches the disk, and each file
/// replaces its predecessor through a rename. A failure part way through
/// can still leave a mix of old and new files behind, so the target
/// directory should be removed before retrying.
#[derive(Debug, Clone)]
pub struct Materializer {
    target_dir: PathBuf,
}

impl Materializer {
    pub fn new<P: Into<PathBuf>>(target_dir: P) -> Self {
        Self {
            target_dir: target_dir.into(),
        }
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// File name and content of every output, without writing anything.
    pub fn render(ctx: &ModificationContext) -> Result<Vec<(String, String)>> {
        let mut files = Vec::with_capacity(DocumentKind::ALL.len() + 1);
        for kind in DocumentKind::ALL {
            files.push((kind.file_name().to_string(), ctx.document(kind).to_yaml()?));
        }
        files.push((README_FILENAME.to_string(), render_readme(ctx)));
        Ok(files)
    }

    pub fn materialize(&self, ctx: &ModificationContext) -> Result<Materialized> {
        let rendered = Self::render(ctx)?;
        std::fs::create_dir_all(&self.target_dir).map_err(|error| Error::MaterializationFailed {
            path: self.target_dir.clone(),
            error,
        })?;

        let mut files = Vec::with_capacity(rendered.len());
        for (name, content) in rendered {
            let path = self.target_dir.join(&name);
            write_file(&path, content.as_bytes())?;
            tracing::debug!(file = %path.display(), "wrote");
            files.push(MaterializedFile {
                name,
                path,
                content,
            });
        }

        let mut staged = Vec::new();
        for (path, content) in ctx.staged_files() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|error| Error::MaterializationFailed {
                    path: parent.to_path_buf(),
                    error,
                })?;
            }
            write_file(path, content.as_bytes())?;
            tracing::debug!(file = %path.display(), "wrote staged file");
            staged.push(path.to_path_buf());
        }

        tracing::info!(
            target_dir = %self.target_dir.display(),
            files = files.len(),
            staged = staged.len(),
            "materialized composition"
        );
        Ok(Materialized {
            target_dir: self.target_dir.clone(),
            files,
            staged,
        })
    }
}

fn render_readme(ctx: &ModificationContext) -> String {
    let title = ctx
        .domains
        .first()
        .cloned()
        .or_else(|| {
            ctx.target_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "Composition".to_string());
    let mut out = format!("# {title}\n\n");
    out.push_str(&ctx.readme.render());
    format!("{}\n", out.trim_end())
}

/// Replace `path` with `content` through a temporary file in the same
/// directory.
pub(crate) fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    let failed = |error: std::io::Error| Error::MaterializationFailed {
        path: path.to_path_buf(),
        error,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(failed)?;
    file.write_all(content).map_err(failed)?;
    file.flush().map_err(failed)?;
    file.persist(path).map_err(|e| failed(e.error))?;
    Ok(())
}
