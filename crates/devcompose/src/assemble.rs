// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Assembly of the selected fragments into composition documents.

use std::fmt;

use crate::catalog::{PLACEHOLDER, ServiceVariant};
use crate::node::{Node, NodeMap, merge};
use crate::parameter::ParameterStore;
use crate::selection::Selection;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./assemble_test.rs"]
mod assemble_test;

/// Which of the two outputs a document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentKind {
    Production,
    DevTools,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Production, DocumentKind::DevTools];

    /// File name the document is materialized as.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Production => "docker-compose.yaml",
            Self::DevTools => "docker-compose-dev-tools.yaml",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::DevTools => f.write_str("dev-tools"),
        }
    }
}

/// A merged compose tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionDocument {
    kind: DocumentKind,
    root: Node,
}

impl CompositionDocument {
    pub fn new(kind: DocumentKind, root: Node) -> Self {
        Self { kind, root }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn services(&self) -> Option<&NodeMap> {
        self.root.get("services").and_then(Node::as_map)
    }

    pub fn services_mut(&mut self) -> Option<&mut NodeMap> {
        self.root.get_mut("services").and_then(Node::as_map_mut)
    }

    pub fn service(&self, name: &str) -> Option<&Node> {
        self.services().and_then(|s| s.get(name))
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services()
            .map(|s| s.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// First placeholder token left anywhere in the tree.
    pub fn find_placeholder(&self) -> Option<String> {
        self.root
            .find_text(&mut |text: &str| PLACEHOLDER.captures(text).map(|c| c[1].to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.root).map_err(|e| Error::yaml(None, e))
    }
}

/// The two documents produced from one selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub production: CompositionDocument,
    pub dev_tools: CompositionDocument,
}

impl Assembly {
    pub fn document(&self, kind: DocumentKind) -> &CompositionDocument {
        match kind {
            DocumentKind::Production => &self.production,
            DocumentKind::DevTools => &self.dev_tools,
        }
    }

    pub fn document_mut(&mut self, kind: DocumentKind) -> &mut CompositionDocument {
        match kind {
            DocumentKind::Production => &mut self.production,
            DocumentKind::DevTools => &mut self.dev_tools,
        }
    }
}

/// Merges the fragments of a selection with resolved parameters.
pub struct Assembler<'a> {
    selection: &'a Selection,
    params: &'a ParameterStore,
}

impl<'a> Assembler<'a> {
    pub fn new(selection: &'a Selection, params: &'a ParameterStore) -> Self {
        Self { selection, params }
    }

    /// Build both documents. Fails on the first placeholder without a value.
    ///
    /// The production document merges the compose fragment of every variant
    /// that is not dev-only. The dev-tools document merges every variant's
    /// compose fragment followed by its dev-tools fragment.
    pub fn assemble(&self) -> Result<Assembly> {
        let mut production = Node::default();
        let mut dev_tools = Node::default();

        for selected in self.selection.variants() {
            let variant = &selected.variant;
            let fragment = self.render(variant, &variant.fragment)?;
            if !variant.dev_only {
                merge(&mut production, fragment.clone());
            }
            merge(&mut dev_tools, fragment);
            if let Some(extra) = &variant.dev_tools {
                merge(&mut dev_tools, self.render(variant, extra)?);
            }
            tracing::debug!(variant = %variant.id, dev_only = variant.dev_only, "merged fragment");
        }

        let assembly = Assembly {
            production: CompositionDocument::new(DocumentKind::Production, production),
            dev_tools: CompositionDocument::new(DocumentKind::DevTools, dev_tools),
        };
        for kind in DocumentKind::ALL {
            if let Some(name) = assembly.document(kind).find_placeholder() {
                return Err(Error::UnresolvedPlaceholder {
                    name,
                    location: format!("the assembled {kind} document"),
                });
            }
        }
        Ok(assembly)
    }

    fn render(&self, variant: &ServiceVariant, fragment: &Node) -> Result<Node> {
        fragment.clone().try_map_text(&mut |text: &str| {
            substitute(text, self.params).map_err(|name| Error::UnresolvedPlaceholder {
                name,
                location: format!("{} ({})", variant.id, variant.source_path.display()),
            })
        })
    }
}

/// Replace every placeholder in `text`. Returns the first name without a value.
fn substitute(text: &str, params: &ParameterStore) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = params
            .value(name.as_str())
            .ok_or_else(|| name.as_str().to_string())?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}
