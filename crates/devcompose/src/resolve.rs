// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Resolution of missing parameters through an external collaborator.

use std::collections::BTreeMap;

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

use crate::parameter::{Parameter, ParameterStore};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./resolve_test.rs"]
mod resolve_test;

/// Length of generated secrets.
pub const SECRET_LENGTH: usize = 24;

/// Supplies a value for a parameter nothing else could resolve.
///
/// `Ok(None)` means "no answer". For secrets that triggers generation,
/// for anything else the build fails.
pub trait ParameterResolver {
    fn resolve(&mut self, parameter: &Parameter) -> Result<Option<String>>;
}

impl<F> ParameterResolver for F
where
    F: FnMut(&Parameter) -> Result<Option<String>>,
{
    fn resolve(&mut self, parameter: &Parameter) -> Result<Option<String>> {
        self(parameter)
    }
}

/// Answers from values supplied up front, e.g. `--param name=value`.
#[derive(Debug, Clone, Default)]
pub struct PresetResolver {
    values: BTreeMap<String, String>,
}

impl PresetResolver {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.values.insert(name.into(), value.into());
    }
}

impl ParameterResolver for PresetResolver {
    fn resolve(&mut self, parameter: &Parameter) -> Result<Option<String>> {
        Ok(self.values.get(&parameter.name).cloned())
    }
}

/// Non-interactive mode: never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessResolver;

impl ParameterResolver for HeadlessResolver {
    fn resolve(&mut self, _parameter: &Parameter) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Settle defaults, surface conflicts, then ask `resolver` for every
/// parameter still missing. Each answer is stored once and therefore
/// seen by every declaration of that name.
pub fn resolve_parameters(
    store: &mut ParameterStore,
    resolver: &mut dyn ParameterResolver,
) -> Result<()> {
    store.settle_defaults();

    if let Some(conflict) = store.conflicts().first() {
        return Err(Error::ParameterConflict {
            name: conflict.name.clone(),
            sites: conflict.sites(),
        });
    }

    let missing: Vec<Parameter> = store.missing().into_iter().cloned().collect();
    for param in missing {
        let answer = if param.explicit {
            // An explicit empty secret skips the question.
            None
        } else {
            resolver.resolve(&param)?.filter(|v| !v.is_empty())
        };
        match answer {
            Some(value) => {
                tracing::debug!(name = %param.name, "parameter resolved");
                store.assign(&param.name, value);
            }
            None if param.is_secret() => {
                tracing::debug!(name = %param.name, "generated secret");
                store.assign(&param.name, generate_secret());
            }
            None => {
                return Err(Error::MissingParameter {
                    name: param.name.clone(),
                    sites: param.sites(),
                });
            }
        }
    }
    Ok(())
}

/// Random alphanumeric secret from the operating system RNG.
pub fn generate_secret() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}
