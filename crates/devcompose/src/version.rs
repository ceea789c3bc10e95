// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Package versions and version ranges used for template recommendations.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::Error;

#[cfg(test)]
#[path = "./version_test.rs"]
mod version_test;

/// Dotted numeric version. Missing parts compare as zero and any
/// pre-release or build suffix is ignored.
#[derive(Debug, Clone, Default)]
pub struct Version {
    parts: Vec<u64>,
}

impl Version {
    pub fn new(parts: Vec<u64>) -> Self {
        Self { parts }
    }

    fn part(&self, index: usize) -> u64 {
        self.parts.get(index).copied().unwrap_or(0)
    }

    /// Smallest version that is greater than every version starting with
    /// the first `len` parts of this one.
    fn bump_prefix(&self, len: usize) -> Self {
        let mut parts: Vec<u64> = (0..len).map(|i| self.part(i)).collect();
        if let Some(last) = parts.last_mut() {
            *last += 1;
        }
        Self { parts }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.part(i).cmp(&other.part(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let trimmed = s.trim().trim_start_matches(['v', 'V']);
        let numeric = trimmed
            .split(['-', '+'])
            .next()
            .unwrap_or_default();
        if numeric.is_empty() {
            return Err(Error::InvalidVersion(s.to_string()));
        }
        let parts = numeric
            .split('.')
            .map(|p| p.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::InvalidVersion(s.to_string()))?;
        Ok(Self { parts })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.parts.iter().map(u64::to_string).collect();
        f.write_str(&rendered.join("."))
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_yaml::Value::deserialize(deserializer)?;
        let text = match raw {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected a version, found {other:?}"
                )));
            }
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Ge,
    Gt,
    Le,
    Lt,
    Eq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    fn matches(&self, version: &Version) -> bool {
        match self.op {
            Op::Ge => version >= &self.version,
            Op::Gt => version > &self.version,
            Op::Le => version <= &self.version,
            Op::Lt => version < &self.version,
            Op::Eq => version == &self.version,
        }
    }
}

/// A set of comparators that must all hold, e.g. `>=2.4.0, <2.5` or `2.4.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    source: String,
    comparators: Vec<Comparator>,
}

impl VersionRange {
    /// Range that matches every version.
    pub fn any() -> Self {
        Self {
            source: "*".to_string(),
            comparators: Vec::new(),
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.comparators.iter().all(|c| c.matches(version))
    }

    fn lower(&self) -> Option<&Version> {
        self.comparators
            .iter()
            .filter(|c| matches!(c.op, Op::Ge | Op::Gt | Op::Eq))
            .map(|c| &c.version)
            .max()
    }

    fn upper(&self) -> Option<&Version> {
        self.comparators
            .iter()
            .filter(|c| matches!(c.op, Op::Le | Op::Lt | Op::Eq))
            .map(|c| &c.version)
            .min()
    }

    /// Compare two ranges by how narrow they are: bounded before unbounded,
    /// higher lower bound first, lower upper bound first.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        let open = |r: &Self| usize::from(r.lower().is_none()) + usize::from(r.upper().is_none());
        open(self)
            .cmp(&open(other))
            .then_with(|| other.lower().cmp(&self.lower()))
            .then_with(|| match (self.upper(), other.upper()) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let mut comparators = Vec::new();
        for token in s.split([',', ' ']).filter(|t| !t.is_empty()) {
            if token == "*" {
                continue;
            }
            let (op, rest) = if let Some(rest) = token.strip_prefix(">=") {
                (Op::Ge, rest)
            } else if let Some(rest) = token.strip_prefix("<=") {
                (Op::Le, rest)
            } else if let Some(rest) = token.strip_prefix("==") {
                (Op::Eq, rest)
            } else if let Some(rest) = token.strip_prefix('>') {
                (Op::Gt, rest)
            } else if let Some(rest) = token.strip_prefix('<') {
                (Op::Lt, rest)
            } else if let Some(rest) = token.strip_prefix('=') {
                (Op::Eq, rest)
            } else {
                (Op::Eq, token)
            };

            if let Some(prefix) = rest.strip_suffix(".*") {
                if op != Op::Eq {
                    return Err(Error::InvalidVersion(s.to_string()));
                }
                let base: Version = prefix.parse()?;
                let len = base.parts.len();
                comparators.push(Comparator {
                    op: Op::Ge,
                    version: base.clone(),
                });
                comparators.push(Comparator {
                    op: Op::Lt,
                    version: base.bump_prefix(len),
                });
                continue;
            }

            comparators.push(Comparator {
                op,
                version: rest.parse()?,
            });
        }
        Ok(Self {
            source: s.trim().to_string(),
            comparators,
        })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_yaml::Value::deserialize(deserializer)?;
        let text = match raw {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected a version range, found {other:?}"
                )));
            }
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}
