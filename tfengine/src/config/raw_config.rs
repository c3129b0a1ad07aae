//! Raw configuration trees and their interpolation
//!
//! A [`RawConfig`] is either a single parsed tree or the merge of two other
//! configs. Both shapes answer the same two questions: which variables are
//! referenced, and what the tree looks like once those variables are bound.

use super::template::{self, ParsedString, TemplateNode};
use super::variable::InterpolatedVariable;
use crate::error::{EngineError, Result};
use crate::types::Dynamic;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Result of [`RawConfig::interpolate`]
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    /// The resolved tree; positions that could not be resolved hold
    /// [`Dynamic::Unknown`]
    pub value: Dynamic,
    /// Sorted top-level keys whose value is, or contains, an unknown
    pub unknown_keys: Vec<String>,
}

/// Configuration for one block, possibly containing `${...}` expressions.
///
/// Cloning is cheap; the parsed tree is shared and never mutated.
#[derive(Debug, Clone)]
pub struct RawConfig {
    source: Source,
}

#[derive(Debug, Clone)]
enum Source {
    Leaf(Arc<LeafSource>),
    Merge(Box<Source>, Box<Source>),
}

#[derive(Debug)]
struct LeafSource {
    key: Option<String>,
    raw: HashMap<String, Dynamic>,
    tree: HashMap<String, ConfigNode>,
    variables: HashMap<String, InterpolatedVariable>,
}

/// Parsed mirror of the raw tree
#[derive(Debug)]
enum ConfigNode {
    Value(Dynamic),
    Template(TemplateNode),
    List(Vec<ConfigNode>),
    Map(HashMap<String, ConfigNode>),
}

impl RawConfig {
    /// Parse every string in `raw` and collect its variable references
    pub fn new(raw: HashMap<String, Dynamic>) -> Result<Self> {
        Self::build(raw, None)
    }

    /// Like [`RawConfig::new`], but [`interpolate`](RawConfig::interpolate)
    /// returns only the resolved value of `key`
    pub fn with_key(raw: HashMap<String, Dynamic>, key: impl Into<String>) -> Result<Self> {
        Self::build(raw, Some(key.into()))
    }

    fn build(raw: HashMap<String, Dynamic>, key: Option<String>) -> Result<Self> {
        let mut variables = HashMap::new();
        let mut tree = HashMap::with_capacity(raw.len());
        for (name, value) in &raw {
            tree.insert(name.clone(), parse_node(value, &mut variables)?);
        }

        Ok(Self {
            source: Source::Leaf(Arc::new(LeafSource {
                key,
                raw,
                tree,
                variables,
            })),
        })
    }

    /// Compose two configs; values from `other` override values from `self`
    pub fn merge(&self, other: &RawConfig) -> RawConfig {
        RawConfig {
            source: Source::Merge(
                Box::new(self.source.clone()),
                Box::new(other.source.clone()),
            ),
        }
    }

    /// Every variable referenced anywhere in this config, keyed by full key
    pub fn variables(&self) -> HashMap<String, InterpolatedVariable> {
        self.source.variables()
    }

    /// The uninterpolated tree. For a merge this is the shallow merge of
    /// both raw trees.
    pub fn raw(&self) -> HashMap<String, Dynamic> {
        self.source.raw()
    }

    /// Resolve every expression against `bindings`.
    ///
    /// Expressions referencing a variable that is missing from `bindings` or
    /// bound to an unknown value are not an error: their position becomes
    /// [`Dynamic::Unknown`] and the owning top-level key is reported.
    pub fn interpolate(&self, bindings: &HashMap<String, Dynamic>) -> Result<Interpolation> {
        self.source.interpolate(bindings)
    }
}

/// Merge two configs, `b` overriding `a`
pub fn merge_raw_configs(a: &RawConfig, b: &RawConfig) -> RawConfig {
    a.merge(b)
}

impl Source {
    fn variables(&self) -> HashMap<String, InterpolatedVariable> {
        match self {
            Source::Leaf(leaf) => leaf.variables.clone(),
            Source::Merge(a, b) => {
                let mut out = a.variables();
                out.extend(b.variables());
                out
            }
        }
    }

    fn raw(&self) -> HashMap<String, Dynamic> {
        match self {
            Source::Leaf(leaf) => leaf.raw.clone(),
            Source::Merge(a, b) => {
                let mut out = a.raw();
                out.extend(b.raw());
                out
            }
        }
    }

    fn interpolate(&self, bindings: &HashMap<String, Dynamic>) -> Result<Interpolation> {
        match self {
            Source::Leaf(leaf) => leaf.interpolate(bindings),
            Source::Merge(a, b) => {
                let b = b.interpolate(bindings)?;
                let Dynamic::Map(overrides) = b.value else {
                    return Ok(b);
                };

                let a = a.interpolate(bindings)?;
                let mut merged = match a.value {
                    Dynamic::Map(base) => base,
                    _ => HashMap::new(),
                };
                merged.extend(overrides);

                let unknown_keys: BTreeSet<String> = a
                    .unknown_keys
                    .into_iter()
                    .chain(b.unknown_keys)
                    .collect();

                Ok(Interpolation {
                    value: Dynamic::Map(merged),
                    unknown_keys: unknown_keys.into_iter().collect(),
                })
            }
        }
    }
}

impl LeafSource {
    fn interpolate(&self, bindings: &HashMap<String, Dynamic>) -> Result<Interpolation> {
        let mut resolved = HashMap::with_capacity(self.tree.len());
        let mut unknown_keys = BTreeSet::new();

        for (name, node) in &self.tree {
            let value = node.resolve(bindings)?;
            if value.contains_unknown() {
                unknown_keys.insert(name.clone());
            }
            resolved.insert(name.clone(), value);
        }

        if let Some(key) = &self.key {
            let value = resolved.remove(key).unwrap_or(Dynamic::Null);
            let unknown_keys = unknown_keys.into_iter().filter(|k| k == key).collect();
            return Ok(Interpolation {
                value,
                unknown_keys,
            });
        }

        Ok(Interpolation {
            value: Dynamic::Map(resolved),
            unknown_keys: unknown_keys.into_iter().collect(),
        })
    }
}

fn parse_node(
    value: &Dynamic,
    variables: &mut HashMap<String, InterpolatedVariable>,
) -> Result<ConfigNode> {
    Ok(match value {
        Dynamic::String(s) => match template::parse(s)? {
            ParsedString::Literal(text) => ConfigNode::Value(Dynamic::String(text)),
            ParsedString::Template(node) => {
                for variable in node.variables() {
                    variables.insert(variable.full_key().to_string(), variable.clone());
                }
                ConfigNode::Template(node)
            }
        },
        Dynamic::List(items) => ConfigNode::List(
            items
                .iter()
                .map(|item| parse_node(item, variables))
                .collect::<Result<_>>()?,
        ),
        Dynamic::Map(map) => ConfigNode::Map(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), parse_node(v, variables)?)))
                .collect::<Result<_>>()?,
        ),
        other => ConfigNode::Value(other.clone()),
    })
}

impl ConfigNode {
    fn resolve(&self, bindings: &HashMap<String, Dynamic>) -> Result<Dynamic> {
        Ok(match self {
            ConfigNode::Value(value) => value.clone(),
            ConfigNode::Template(node) => node.evaluate(bindings)?,
            ConfigNode::List(items) => Dynamic::List(
                items
                    .iter()
                    .map(|item| item.resolve(bindings))
                    .collect::<Result<_>>()?,
            ),
            ConfigNode::Map(map) => Dynamic::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), v.resolve(bindings)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

impl TryFrom<serde_json::Value> for RawConfig {
    type Error = EngineError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        let raw: HashMap<String, Dynamic> = serde_json::from_value(value)
            .map_err(|e| EngineError::DecodingError(format!("configuration must be a map: {e}")))?;
        RawConfig::new(raw)
    }
}
