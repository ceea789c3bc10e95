// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Value parsers for command line arguments.

use devcompose::Version;
use thiserror::Error;

#[cfg(test)]
#[path = "./args_test.rs"]
mod args_test;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("expected KEY=VALUE, got '{0}'")]
    MissingSeparator(String),

    #[error("empty key in '{0}'")]
    EmptyKey(String),

    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },
}

/// Parse `key=value`. The value may be empty and may contain `=`.
pub fn parse_key_value(input: &str) -> Result<(String, String), ArgError> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| ArgError::MissingSeparator(input.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ArgError::EmptyKey(input.to_string()));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse `package=version` as used by `--locked`.
pub fn parse_locked(input: &str) -> Result<(String, Version), ArgError> {
    let (package, version) = parse_key_value(input)?;
    let version = parse_version(&version)?;
    Ok((package, version))
}

pub fn parse_version(input: &str) -> Result<Version, ArgError> {
    input.trim().parse().map_err(|e: devcompose::Error| ArgError::InvalidVersion {
        version: input.to_string(),
        reason: e.to_string(),
    })
}
