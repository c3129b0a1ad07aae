//! Core value and instance types
//!
//! [`Dynamic`] is the value type of configuration trees and interpolation
//! results. [`InstanceInfo`] and [`InstanceState`] identify and describe one
//! resource instance as it moves through Diff/Refresh/Apply.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Legacy wire representation of an unknown value.
///
/// Only used at the JSON boundary; in memory an unknown value is always
/// [`Dynamic::Unknown`].
pub const UNKNOWN_VARIABLE_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// Dynamic represents any configuration value, including values that are not
/// known until apply time
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    Bool(bool),
    /// All numbers are f64
    Number(f64),
    String(String),
    /// Ordered, allows duplicates
    List(Vec<Dynamic>),
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (resolved by applying another resource first)
    Unknown,
}

impl Dynamic {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Dynamic]> {
        match self {
            Dynamic::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    /// True if this value or anything nested inside it is unknown
    pub fn contains_unknown(&self) -> bool {
        match self {
            Dynamic::Unknown => true,
            Dynamic::List(l) => l.iter().any(Dynamic::contains_unknown),
            Dynamic::Map(m) => m.values().any(Dynamic::contains_unknown),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }
}

impl From<&str> for Dynamic {
    fn from(s: &str) -> Self {
        Dynamic::String(s.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(s: String) -> Self {
        Dynamic::String(s)
    }
}

impl From<bool> for Dynamic {
    fn from(b: bool) -> Self {
        Dynamic::Bool(b)
    }
}

impl From<f64> for Dynamic {
    fn from(n: f64) -> Self {
        Dynamic::Number(n)
    }
}

impl<T: Into<Dynamic>> From<Vec<T>> for Dynamic {
    fn from(v: Vec<T>) -> Self {
        Dynamic::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<HashMap<String, Dynamic>> for Dynamic {
    fn from(m: HashMap<String, Dynamic>) -> Self {
        Dynamic::Map(m)
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < (i64::MAX as f64) {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_str(UNKNOWN_VARIABLE_VALUE),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a configuration value")
            }

            fn visit_unit<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                if value == UNKNOWN_VARIABLE_VALUE {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value.to_string()))
                }
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                if value == UNKNOWN_VARIABLE_VALUE {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value))
                }
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Dynamic::List(vec))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut hashmap = HashMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    hashmap.insert(key, value);
                }
                Ok(Dynamic::Map(hashmap))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// Diagnostic represents a warning or error from validation
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Single-line rendering used on the wire
    pub fn message(&self) -> String {
        if self.detail.is_empty() {
            self.summary.clone()
        } else {
            format!("{}: {}", self.summary, self.detail)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// Warnings and errors collected by a validation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: Option<impl Into<String>>) {
        self.errors.push(Diagnostic::error(
            summary,
            detail.map(Into::into).unwrap_or_default(),
        ));
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: Option<impl Into<String>>) {
        self.warnings.push(Diagnostic::warning(
            summary,
            detail.map(Into::into).unwrap_or_default(),
        ));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(Diagnostic::message).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(Diagnostic::message).collect()
    }
}

/// Identifies the resource instance a provider call is about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceInfo {
    /// Opaque instance id, used for correlation only
    pub id: String,
    /// Module names from the root module down to the owning module
    pub module_path: Vec<String>,
    /// Resource type name, e.g. "aws_instance"
    pub resource_type: String,
}

impl InstanceInfo {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            module_path: Vec::new(),
            resource_type: resource_type.into(),
        }
    }

    /// Human readable address like "module.network.aws_vpc"
    pub fn human_id(&self) -> String {
        let mut parts: Vec<String> = self
            .module_path
            .iter()
            .filter(|m| m.as_str() != "root")
            .map(|m| format!("module.{m}"))
            .collect();
        parts.push(self.resource_type.clone());
        parts.join(".")
    }
}

/// Transient data that only matters while applying (connection details)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EphemeralState {
    pub conn_info: HashMap<String, String>,
}

/// Current state of one resource instance in flattened attribute form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceState {
    /// Provider-assigned id, empty when the resource does not exist yet
    pub id: String,
    pub attributes: HashMap<String, String>,
    pub ephemeral: EphemeralState,
    /// Provider-private bookkeeping
    pub meta: HashMap<String, String>,
}

impl InstanceState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn exists(&self) -> bool {
        !self.id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_serializes_as_legacy_sentinel() {
        let json = serde_json::to_string(&Dynamic::Unknown).unwrap();
        assert_eq!(json, format!("\"{}\"", UNKNOWN_VARIABLE_VALUE));

        let back: Dynamic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Dynamic::Unknown);
    }

    #[test]
    fn integral_numbers_serialize_without_fraction() {
        assert_eq!(serde_json::to_string(&Dynamic::Number(3.0)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&Dynamic::Number(1.5)).unwrap(), "1.5");
    }

    #[test]
    fn nested_json_deserializes_into_dynamic() {
        let value: Dynamic =
            serde_json::from_str(r#"{"name":"web","ports":[80,443],"tags":{"env":null}}"#)
                .unwrap();

        let map = value.as_map().unwrap();
        assert_eq!(map["name"].as_str(), Some("web"));
        assert_eq!(map["ports"].as_list().unwrap().len(), 2);
        assert!(map["tags"].as_map().unwrap()["env"].is_null());
    }

    #[test]
    fn contains_unknown_looks_inside_collections() {
        let value = Dynamic::List(vec![
            Dynamic::from("a"),
            Dynamic::Map(HashMap::from([("x".to_string(), Dynamic::Unknown)])),
        ]);
        assert!(value.contains_unknown());
        assert!(!Dynamic::from("a").contains_unknown());
    }

    #[test]
    fn diagnostics_render_messages() {
        let mut diags = Diagnostics::new();
        diags.add_error("name is required", None::<String>);
        diags.add_warning("deprecated", Some("use tags instead"));

        assert!(diags.has_errors());
        assert_eq!(diags.error_messages(), vec!["name is required"]);
        assert_eq!(diags.warning_messages(), vec!["deprecated: use tags instead"]);
    }

    #[test]
    fn human_id_includes_module_path() {
        let mut info = InstanceInfo::new("i-1", "aws_instance");
        info.module_path = vec!["root".to_string(), "network".to_string()];
        assert_eq!(info.human_id(), "module.network.aws_instance");
    }
}
