// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Post-assembly transformations of the composition documents.
//!
//! A [`Pipeline`] holds an explicit list of [`Modifier`] values, kept
//! sorted by their sort order, and runs them one after the other against a
//! single [`ModificationContext`]. The first failure aborts the pipeline.

use crate::config::EngineConfig;
use crate::context::ModificationContext;
use crate::{Error, Result};

mod certificates;
mod credentials;
mod hosts;
mod mounts;
mod proxy;
pub mod routing;
mod test_image;

pub use certificates::{CertificateGenerator, CertificatesModifier, MkcertGenerator};
pub use credentials::CredentialEscaping;
pub use hosts::HostsModifier;
pub use mounts::MountPaths;
pub use proxy::ReverseProxyTls;
pub use test_image::TestImages;


/// One ordered transformation of a [`ModificationContext`].
pub trait Modifier {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Lower values run first.
    fn sort_order(&self) -> i32;

    fn modify(&mut self, ctx: &mut ModificationContext) -> Result<()>;
}

/// Modifiers sorted ascending by sort order.
#[derive(Default)]
pub struct Pipeline {
    modifiers: Vec<Box<dyn Modifier>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in modifiers configured from `config`.
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let mut pipeline = Self::new();
        pipeline.register(Box::new(MountPaths));
        pipeline.register(Box::new(ReverseProxyTls::new(&config.proxy.entrypoint)));

        let mut certificates = CertificatesModifier::new(
            config.proxy.certificates_dir.clone(),
            &config.proxy.certificates_mount,
        );
        if config.proxy.generate_certificates {
            certificates = certificates.with_generator(Box::new(MkcertGenerator::default()));
        }
        pipeline.register(Box::new(certificates));

        pipeline.register(Box::new(HostsModifier::new(
            &config.hosts.file,
            &config.hosts.ip,
            config.hosts.manage,
        )));
        pipeline.register(Box::new(CredentialEscaping::new(
            config.credentials.markers.clone(),
        )));
        if config.test_images.enabled {
            pipeline.register(Box::new(TestImages::new(config.test_images.images.clone())));
        }
        pipeline
    }

    /// Add a modifier. Modifiers with equal sort order keep registration order.
    pub fn register(&mut self, modifier: Box<dyn Modifier>) {
        let order = modifier.sort_order();
        let index = self
            .modifiers
            .iter()
            .position(|m| m.sort_order() > order)
            .unwrap_or(self.modifiers.len());
        self.modifiers.insert(index, modifier);
    }

    /// Names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.modifiers.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    pub fn run(&mut self, ctx: &mut ModificationContext) -> Result<()> {
        for modifier in &mut self.modifiers {
            tracing::debug!(
                modifier = modifier.name(),
                order = modifier.sort_order(),
                "running modifier"
            );
            modifier
                .modify(ctx)
                .map_err(|source| Error::ModifierFailed {
                    modifier: modifier.name(),
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("modifiers", &self.names())
            .finish()
    }
}
