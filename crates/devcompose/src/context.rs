// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! State shared by the modifier pipeline for one build.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::assemble::{Assembly, CompositionDocument, DocumentKind};

#[cfg(test)]
#[path = "./context_test.rs"]
mod context_test;

/// One titled block of the generated README.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadmeSection {
    pub title: String,
    pub order: i32,
    pub body: String,
}

/// Markdown sections ordered by the sort order of whoever wrote them.
///
/// Sections are keyed by title: writing a title again replaces the body.
#[derive(Debug, Clone, Default)]
pub struct ReadmeBuffer {
    sections: Vec<ReadmeSection>,
}

impl ReadmeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_section<T: Into<String>, B: Into<String>>(&mut self, order: i32, title: T, body: B) {
        let title = title.into();
        let body = body.into();
        match self.sections.iter_mut().find(|s| s.title == title) {
            Some(section) => {
                section.order = order;
                section.body = body;
            }
            None => self.sections.push(ReadmeSection { title, order, body }),
        }
    }

    pub fn section(&self, title: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.body.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Render all sections, lowest order first. Ties keep insertion order.
    pub fn render(&self) -> String {
        let mut sections: Vec<&ReadmeSection> = self.sections.iter().collect();
        sections.sort_by_key(|s| s.order);
        let mut out = String::new();
        for section in sections {
            out.push_str("## ");
            out.push_str(&section.title);
            out.push_str("\n\n");
            out.push_str(section.body.trim_end());
            out.push_str("\n\n");
        }
        out
    }
}

/// Mutable carrier handed to every modifier.
#[derive(Debug, Clone)]
pub struct ModificationContext {
    pub production: CompositionDocument,
    pub dev_tools: CompositionDocument,
    /// Directory the documents are written to.
    pub target_dir: PathBuf,
    /// Directory relative host paths in fragments are written against.
    pub project_root: PathBuf,
    pub readme: ReadmeBuffer,
    /// Domains routed to this composition.
    pub domains: Vec<String>,
    /// Resolved secret values.
    pub credentials: BTreeSet<String>,
    applied: BTreeSet<String>,
    staged: BTreeMap<PathBuf, String>,
}

impl ModificationContext {
    pub fn new<R: Into<PathBuf>, T: Into<PathBuf>>(
        assembly: Assembly,
        project_root: R,
        target_dir: T,
    ) -> Self {
        Self {
            production: assembly.production,
            dev_tools: assembly.dev_tools,
            target_dir: target_dir.into(),
            project_root: project_root.into(),
            readme: ReadmeBuffer::new(),
            domains: Vec::new(),
            credentials: BTreeSet::new(),
            applied: BTreeSet::new(),
            staged: BTreeMap::new(),
        }
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    pub fn with_credentials(mut self, credentials: BTreeSet<String>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn document(&self, kind: DocumentKind) -> &CompositionDocument {
        match kind {
            DocumentKind::Production => &self.production,
            DocumentKind::DevTools => &self.dev_tools,
        }
    }

    pub fn documents(&self) -> [&CompositionDocument; 2] {
        [&self.production, &self.dev_tools]
    }

    pub fn documents_mut(&mut self) -> [&mut CompositionDocument; 2] {
        [&mut self.production, &mut self.dev_tools]
    }

    /// Record a one-shot transformation. Returns false when it already ran
    /// against this context.
    pub fn mark_applied(&mut self, key: &str) -> bool {
        self.applied.insert(key.to_string())
    }

    pub fn is_applied(&self, key: &str) -> bool {
        self.applied.contains(key)
    }

    /// Queue a file outside the compose documents to be written with them.
    /// Staging the same path again replaces the earlier content.
    pub fn stage_file<P: Into<PathBuf>, S: Into<String>>(&mut self, path: P, content: S) {
        self.staged.insert(path.into(), content.into());
    }

    pub fn staged_file(&self, path: &Path) -> Option<&str> {
        self.staged.get(path).map(String::as_str)
    }

    pub fn staged_files(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.staged.iter().map(|(path, content)| (path.as_path(), content.as_str()))
    }
}
