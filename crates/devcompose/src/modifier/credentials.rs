// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use super::Modifier;
use crate::context::ModificationContext;
use crate::node::Node;
use crate::Result;

#[cfg(test)]
#[path = "./credentials_test.rs"]
mod credentials_test;

/// Escapes `$` in credential values so compose does not interpolate them.
///
/// An environment entry counts as a credential when its upper-cased key
/// contains one of the markers, or when its value embeds a resolved secret.
/// Runs at most once per context.
#[derive(Debug, Clone)]
pub struct CredentialEscaping {
    markers: Vec<String>,
}

impl CredentialEscaping {
    pub const SORT_ORDER: i32 = 900;

    pub fn new(markers: Vec<String>) -> Self {
        Self {
            markers: markers.into_iter().map(|m| m.to_uppercase()).collect(),
        }
    }

    fn is_credential(&self, key: &str, value: &str, secrets: &BTreeSet<String>) -> bool {
        let key = key.to_uppercase();
        self.markers.iter().any(|m| key.contains(m.as_str()))
            || secrets
                .iter()
                .any(|secret| !secret.is_empty() && value.contains(secret.as_str()))
    }
}

pub(crate) fn escape(value: &str) -> String {
    value.replace('$', "$$")
}

impl Modifier for CredentialEscaping {
    fn name(&self) -> &'static str {
        "credential-escaping"
    }

    fn sort_order(&self) -> i32 {
        Self::SORT_ORDER
    }

    fn modify(&mut self, ctx: &mut ModificationContext) -> Result<()> {
        if !ctx.mark_applied(self.name()) {
            tracing::debug!("credentials already escaped");
            return Ok(());
        }
        let secrets = ctx.credentials.clone();
        let mut escaped = 0;
        for doc in ctx.documents_mut() {
            let Some(services) = doc.services_mut() else {
                continue;
            };
            for service in services.values_mut() {
                let Some(environment) = service.get_mut("environment") else {
                    continue;
                };
                match environment {
                    Node::Map(entries) => {
                        for (key, value) in entries.iter_mut() {
                            let Some(text) = value.as_str() else {
                                continue;
                            };
                            if text.contains('$') && self.is_credential(key, text, &secrets) {
                                *value = Node::string(escape(text));
                                escaped += 1;
                            }
                        }
                    }
                    Node::List(entries) => {
                        for entry in entries.iter_mut() {
                            let Some((key, text)) = entry.as_str().and_then(|e| e.split_once('=')) else {
                                continue;
                            };
                            if text.contains('$') && self.is_credential(key, text, &secrets) {
                                let replaced = format!("{key}={}", escape(text));
                                *entry = Node::string(replaced);
                                escaped += 1;
                            }
                        }
                    }
                    Node::Scalar(_) => {}
                }
            }
        }
        tracing::debug!(escaped, "escaped credential values");
        Ok(())
    }
}
