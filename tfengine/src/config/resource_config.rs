//! Interpolated configuration handed to providers

use super::raw_config::RawConfig;
use crate::error::Result;
use crate::types::Dynamic;
use std::collections::HashMap;

/// Configuration of one resource after interpolation.
///
/// Values that could not be resolved are [`Dynamic::Unknown`]; their top-level
/// keys are listed in `computed_keys`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceConfig {
    pub config: HashMap<String, Dynamic>,
    /// Sorted top-level keys that will only be known after apply
    pub computed_keys: Vec<String>,
}

impl ResourceConfig {
    /// Interpolate `raw` without any bindings. Every reference becomes
    /// unknown, which is what a provider sees before the graph is walked.
    pub fn new(raw: &RawConfig) -> Result<Self> {
        Self::with_bindings(raw, &HashMap::new())
    }

    pub fn with_bindings(raw: &RawConfig, bindings: &HashMap<String, Dynamic>) -> Result<Self> {
        let interpolation = raw.interpolate(bindings)?;
        let config = match interpolation.value {
            Dynamic::Map(map) => map,
            Dynamic::Null => HashMap::new(),
            other => HashMap::from([("value".to_string(), other)]),
        };

        Ok(Self {
            config,
            computed_keys: interpolation.unknown_keys,
        })
    }

    /// Build directly from resolved values
    pub fn from_map(config: HashMap<String, Dynamic>) -> Self {
        let mut computed_keys: Vec<String> = config
            .iter()
            .filter(|(_, v)| v.contains_unknown())
            .map(|(k, _)| k.clone())
            .collect();
        computed_keys.sort();

        Self {
            config,
            computed_keys,
        }
    }

    /// Look up a dotted path such as `tags.Name` or `subnets.0`.
    ///
    /// Returns [`Dynamic::Unknown`] when the path runs through an unknown value.
    pub fn get(&self, path: &str) -> Option<Dynamic> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.config.get(first)?;

        for part in parts {
            current = match current {
                Dynamic::Unknown => return Some(Dynamic::Unknown),
                Dynamic::Map(map) => map.get(part)?,
                Dynamic::List(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current.clone())
    }

    /// True when the value at `path`, or any value on the way to it, is unknown
    pub fn is_computed(&self, path: &str) -> bool {
        if self
            .computed_keys
            .iter()
            .any(|k| k == path)
        {
            return true;
        }
        self.get(path).is_some_and(|v| v.contains_unknown())
    }

    /// True when `path` is present, including unknown values
    pub fn is_set(&self, path: &str) -> bool {
        self.get(path).is_some_and(|v| !v.is_null())
    }
}
