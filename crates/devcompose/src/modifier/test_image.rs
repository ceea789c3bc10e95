// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use super::Modifier;
use crate::context::ModificationContext;
use crate::node::Node;
use crate::Result;

#[cfg(test)]
#[path = "./test_image_test.rs"]
mod test_image_test;

/// Swaps image repositories for test builds, keeping the tag.
///
/// `images` maps a repository (`mysql`, `registry/php`) to its
/// replacement. Only the production document is touched since that is
/// what test runs start.
#[derive(Debug, Clone, Default)]
pub struct TestImages {
    images: BTreeMap<String, String>,
}

impl TestImages {
    pub const SORT_ORDER: i32 = 1000;

    pub fn new(images: BTreeMap<String, String>) -> Self {
        Self { images }
    }

    fn replace(&self, image: &str) -> Option<String> {
        let (repository, tag) = split_image(image);
        let replacement = self.images.get(repository)?;
        Some(match tag {
            Some(tag) => format!("{replacement}:{tag}"),
            None => replacement.clone(),
        })
    }
}

/// Split `repo[:tag]`, ignoring a registry port.
pub(crate) fn split_image(image: &str) -> (&str, Option<&str>) {
    let name_start = image.rfind('/').map(|i| i + 1).unwrap_or(0);
    match image[name_start..].rfind(':') {
        Some(i) => {
            let split = name_start + i;
            (&image[..split], Some(&image[split + 1..]))
        }
        None => (image, None),
    }
}

impl Modifier for TestImages {
    fn name(&self) -> &'static str {
        "test-images"
    }

    fn sort_order(&self) -> i32 {
        Self::SORT_ORDER
    }

    fn modify(&mut self, ctx: &mut ModificationContext) -> Result<()> {
        let Some(services) = ctx.production.services_mut() else {
            return Ok(());
        };
        for (name, service) in services.iter_mut() {
            let Some(image) = service.get_mut("image") else {
                continue;
            };
            let Some(replacement) = image.as_str().and_then(|i| self.replace(i)) else {
                continue;
            };
            tracing::debug!(service = %name, image = %replacement, "using test image");
            *image = Node::string(replacement);
        }
        Ok(())
    }
}
