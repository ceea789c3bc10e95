// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use super::Modifier;
use super::routing::{add_label, is_routed, router_label, routers};
use crate::context::ModificationContext;
use crate::Result;

#[cfg(test)]
#[path = "./proxy_test.rs"]
mod proxy_test;

/// Suffix of the TLS router added next to every plain router.
pub const SECURE_SUFFIX: &str = "-secure";

/// Adds a TLS router for every plain HTTP router of a routed service.
///
/// The secure router copies the rule (and service, if set) of the plain one
/// and listens on the configured entry point. Existing labels are left alone.
#[derive(Debug, Clone)]
pub struct ReverseProxyTls {
    entrypoint: String,
}

impl ReverseProxyTls {
    pub const SORT_ORDER: i32 = 20;

    pub fn new<S: Into<String>>(entrypoint: S) -> Self {
        Self {
            entrypoint: entrypoint.into(),
        }
    }
}

impl Modifier for ReverseProxyTls {
    fn name(&self) -> &'static str {
        "reverse-proxy-tls"
    }

    fn sort_order(&self) -> i32 {
        Self::SORT_ORDER
    }

    fn modify(&mut self, ctx: &mut ModificationContext) -> Result<()> {
        for doc in ctx.documents_mut() {
            let kind = doc.kind();
            let Some(services) = doc.services_mut() else {
                continue;
            };
            for (name, service) in services.iter_mut() {
                if !is_routed(service) {
                    continue;
                }
                let existing = routers(service);
                for router in &existing {
                    let Some(rule) = &router.rule else {
                        continue;
                    };
                    if router.tls || router.name.ends_with(SECURE_SUFFIX) {
                        continue;
                    }
                    let secure = format!("{}{SECURE_SUFFIX}", router.name);
                    let mut added = add_label(service, &router_label(&secure, "rule"), rule);
                    added |= add_label(
                        service,
                        &router_label(&secure, "entrypoints"),
                        &self.entrypoint,
                    );
                    added |= add_label(service, &router_label(&secure, "tls"), "true");
                    if let Some(target) = &router.service {
                        added |= add_label(service, &router_label(&secure, "service"), target);
                    }
                    if added {
                        tracing::debug!(%kind, service = %name, router = %secure, "added TLS router");
                    }
                }
            }
        }
        Ok(())
    }
}
