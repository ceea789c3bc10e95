// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Generic tree value used for compose fragments and merged documents.
//!
//! Fragments are parsed from YAML into [`Node`] so that merging is a typed,
//! recursive operation instead of loose value juggling. Maps keep insertion
//! order, which makes serialized output stable for identical inputs.

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;

#[cfg(test)]
#[path = "./node_test.rs"]
mod node_test;

/// Ordered mapping used for every map node.
pub type NodeMap = IndexMap<String, Node>;

/// Leaf value of a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_yaml::Number),
    String(String),
}

/// A tree of scalars, lists and maps.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    List(Vec<Node>),
    Map(NodeMap),
}

impl Default for Node {
    fn default() -> Self {
        Self::Map(NodeMap::new())
    }
}

impl Node {
    /// Create a string leaf.
    pub fn string<S: Into<String>>(value: S) -> Self {
        Self::Scalar(Scalar::String(value.into()))
    }

    /// Convert a parsed YAML value into a tree.
    ///
    /// Non-string keys are stringified, tags are unwrapped. Compound keys are
    /// rejected because compose documents never use them.
    pub fn from_yaml(value: Value) -> std::result::Result<Self, String> {
        Ok(match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Sequence(items) => Self::List(
                items
                    .into_iter()
                    .map(Self::from_yaml)
                    .collect::<std::result::Result<_, _>>()?,
            ),
            Value::Mapping(mapping) => {
                let mut map = NodeMap::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let key = match key {
                        Value::String(s) => s,
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        Value::Null => "null".to_string(),
                        other => return Err(format!("unsupported map key: {other:?}")),
                    };
                    map.insert(key, Self::from_yaml(value)?);
                }
                Self::Map(map)
            }
            Value::Tagged(tagged) => Self::from_yaml(tagged.value)?,
        })
    }

    pub fn as_map(&self) -> Option<&NodeMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut NodeMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Render a scalar the way it would appear in an environment file.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s.clone()),
            Self::Scalar(Scalar::Number(n)) => Some(n.to_string()),
            Self::Scalar(Scalar::Bool(b)) => Some(b.to_string()),
            Self::Scalar(Scalar::Null) => Some(String::new()),
            _ => None,
        }
    }

    /// Look up a key of a map node.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|map| map.get(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.as_map_mut().and_then(|map| map.get_mut(key))
    }

    /// Rebuild the tree passing every map key and string leaf through `f`.
    pub fn try_map_text<E, F>(self, f: &mut F) -> std::result::Result<Self, E>
    where
        F: FnMut(&str) -> std::result::Result<String, E>,
    {
        Ok(match self {
            Self::Scalar(Scalar::String(s)) => Self::Scalar(Scalar::String(f(&s)?)),
            Self::Scalar(other) => Self::Scalar(other),
            Self::List(items) => Self::List(
                items
                    .into_iter()
                    .map(|item| item.try_map_text(f))
                    .collect::<std::result::Result<_, _>>()?,
            ),
            Self::Map(map) => {
                let mut rebuilt = NodeMap::with_capacity(map.len());
                for (key, value) in map {
                    let key = f(&key)?;
                    let value = value.try_map_text(f)?;
                    match rebuilt.get_mut(&key) {
                        Some(existing) => merge(existing, value),
                        None => {
                            rebuilt.insert(key, value);
                        }
                    }
                }
                Self::Map(rebuilt)
            }
        })
    }

    /// Find the first map key or string leaf for which `pred` returns a value.
    pub fn find_text<T, F>(&self, pred: &mut F) -> Option<T>
    where
        F: FnMut(&str) -> Option<T>,
    {
        match self {
            Self::Scalar(Scalar::String(s)) => pred(s),
            Self::Scalar(_) => None,
            Self::List(items) => items.iter().find_map(|item| item.find_text(pred)),
            Self::Map(map) => map
                .iter()
                .find_map(|(key, value)| pred(key).or_else(|| value.find_text(pred))),
        }
    }
}

/// Merge `overlay` into `base`.
///
/// Maps merge recursively, lists concatenate, everything else is replaced
/// by the overlay.
pub fn merge(base: &mut Node, overlay: Node) {
    match (base, overlay) {
        (Node::Map(base), Node::Map(overlay)) => merge_maps(base, overlay),
        (Node::List(base), Node::List(overlay)) => merge_lists(base, overlay),
        (base, overlay) => merge_scalar(base, overlay),
    }
}

/// Last writer wins.
pub fn merge_scalar(base: &mut Node, overlay: Node) {
    *base = overlay;
}

/// Append overlay items after the base items. No deduplication happens here.
pub fn merge_lists(base: &mut Vec<Node>, overlay: Vec<Node>) {
    base.extend(overlay);
}

/// Merge matching keys recursively, append new keys in overlay order.
pub fn merge_maps(base: &mut NodeMap, overlay: NodeMap) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => merge(existing, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(scalar) => scalar.serialize(serializer),
            Self::List(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_yaml(value).map_err(D::Error::custom)
    }
}
