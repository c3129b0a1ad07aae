//! Per-attribute change sets produced by providers
//!
//! An [`InstanceDiff`] is what a provider's Diff returns and what its Apply
//! consumes. Attribute keys use the flattened form of [`crate::flatmap`].

use crate::error::{EngineError, Result};
use crate::types::{InstanceState, UNKNOWN_VARIABLE_VALUE};
use std::collections::HashMap;

/// Whether an attribute is set by the user or only reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DiffAttrType {
    #[default]
    Unknown,
    Input,
    Output,
}

/// Change to a single attribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceAttrDiff {
    pub old: String,
    pub new: String,
    /// New value is only known after apply
    pub new_computed: bool,
    pub new_removed: bool,
    /// Provider-private payload, carried through untouched. `Null` means none.
    pub new_extra: serde_json::Value,
    /// Changing this attribute replaces the resource
    pub requires_new: bool,
    pub attr_type: DiffAttrType,
}

impl ResourceAttrDiff {
    pub fn change(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
            ..Self::default()
        }
    }

    pub fn computed(old: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new_computed: true,
            ..Self::default()
        }
    }

    pub fn removed(old: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new_removed: true,
            ..Self::default()
        }
    }

    pub fn requires_new(mut self) -> Self {
        self.requires_new = true;
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.new_extra = extra;
        self
    }

    pub fn with_type(mut self, attr_type: DiffAttrType) -> Self {
        self.attr_type = attr_type;
        self
    }
}

/// Coarse classification of what applying a diff will do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffChangeType {
    None,
    Create,
    Update,
    Destroy,
    DestroyCreate,
}

/// All changes for one resource instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceDiff {
    pub attributes: HashMap<String, ResourceAttrDiff>,
    pub destroy: bool,
    /// Destroy and recreate regardless of attribute changes. Only valid
    /// together with `destroy`.
    pub destroy_tainted: bool,
}

impl InstanceDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destroy() -> Self {
        Self {
            destroy: true,
            ..Self::default()
        }
    }

    pub fn destroy_tainted() -> Self {
        Self {
            destroy: true,
            destroy_tainted: true,
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, diff: ResourceAttrDiff) -> Self {
        self.attributes.insert(key.into(), diff);
        self
    }

    /// `destroy_tainted` without `destroy` is rejected, never repaired
    pub fn check_consistency(&self) -> Result<()> {
        if self.destroy_tainted && !self.destroy {
            return Err(EngineError::InconsistentDiff(
                "destroyTainted is set but destroy is not".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        !self.destroy && !self.destroy_tainted && self.attributes.is_empty()
    }

    pub fn requires_new(&self) -> bool {
        self.attributes.values().any(|a| a.requires_new)
    }

    pub fn change_type(&self) -> DiffChangeType {
        if self.is_empty() {
            return DiffChangeType::None;
        }
        let replace = self.requires_new() || self.destroy_tainted;
        match (self.destroy, replace) {
            (true, true) if !self.attributes.is_empty() => DiffChangeType::DestroyCreate,
            (true, _) => DiffChangeType::Destroy,
            (false, true) => DiffChangeType::Create,
            (false, false) => DiffChangeType::Update,
        }
    }
}

impl InstanceState {
    /// State as it will look after `diff` is applied, as far as is known now.
    ///
    /// Computed attributes hold the unknown sentinel.
    pub fn merge_diff(&self, diff: &InstanceDiff) -> InstanceState {
        let mut merged = self.clone();
        for (key, attr) in &diff.attributes {
            if attr.new_removed {
                merged.attributes.remove(key);
            } else if attr.new_computed {
                merged
                    .attributes
                    .insert(key.clone(), UNKNOWN_VARIABLE_VALUE.to_string());
            } else {
                merged.attributes.insert(key.clone(), attr.new.clone());
            }
        }
        merged
    }
}
