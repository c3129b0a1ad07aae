//! References to values supplied from outside a configuration tree

use crate::error::{EngineError, Result};
use std::fmt;

/// Whether a resource is managed (created/updated/deleted) or a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceMode {
    Managed,
    Data,
}

impl fmt::Display for ResourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceMode::Managed => f.write_str("managed"),
            ResourceMode::Data => f.write_str("data"),
        }
    }
}

/// What an [`InterpolatedVariable`] points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// `var.<name>`
    User { name: String },
    /// `module.<module>.<output>`
    Module { module: String, output: String },
    /// `count.<field>`
    Count { field: String },
    /// `path.<field>`
    Path { field: String },
    /// `self.<attribute>`
    SelfRef { attribute: String },
    /// `local.<name>`
    Local { name: String },
    /// `<type>.<name>[.<attribute>]` or `data.<type>.<name>[.<attribute>]`
    Resource {
        mode: ResourceMode,
        resource_type: String,
        name: String,
        attribute: Option<String>,
    },
    /// A bare identifier
    Simple { name: String },
}

/// A reference found by static analysis of a configuration tree.
///
/// Identity is the full dotted key, e.g. `aws_instance.web.id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterpolatedVariable {
    key: String,
    kind: VariableKind,
}

impl InterpolatedVariable {
    /// Parse a full dotted key
    pub fn parse(key: &str) -> Result<Self> {
        let segments: Vec<&str> = key.split('.').collect();
        Self::from_segments(&segments)
    }

    pub(crate) fn from_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self> {
        let parts: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
        let key = parts.join(".");

        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid(&key, "empty path segment"));
        }

        let rest = |from: usize| parts[from..].join(".");

        let kind = match parts.as_slice() {
            [] => return Err(invalid(&key, "empty reference")),
            ["var", _, ..] => VariableKind::User { name: rest(1) },
            ["var"] => return Err(invalid(&key, "missing variable name")),
            ["module", module, _, ..] => VariableKind::Module {
                module: module.to_string(),
                output: rest(2),
            },
            ["module", ..] => return Err(invalid(&key, "expected module.<name>.<output>")),
            ["count", _, ..] => VariableKind::Count { field: rest(1) },
            ["path", _, ..] => VariableKind::Path { field: rest(1) },
            ["self", _, ..] => VariableKind::SelfRef { attribute: rest(1) },
            ["local", _, ..] => VariableKind::Local { name: rest(1) },
            ["count" | "path" | "self" | "local"] => {
                return Err(invalid(&key, "missing field name"))
            }
            ["data", resource_type, name, ..] => VariableKind::Resource {
                mode: ResourceMode::Data,
                resource_type: resource_type.to_string(),
                name: name.to_string(),
                attribute: (parts.len() > 3).then(|| rest(3)),
            },
            ["data", ..] => return Err(invalid(&key, "expected data.<type>.<name>")),
            [resource_type, name, ..] => VariableKind::Resource {
                mode: ResourceMode::Managed,
                resource_type: resource_type.to_string(),
                name: name.to_string(),
                attribute: (parts.len() > 2).then(|| rest(2)),
            },
            [name] => VariableKind::Simple {
                name: name.to_string(),
            },
        };

        Ok(Self { key, kind })
    }

    pub fn full_key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    pub(crate) fn segments(&self) -> impl Iterator<Item = &str> {
        self.key.split('.')
    }
}

impl fmt::Display for InterpolatedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn invalid(key: &str, reason: &str) -> EngineError {
    EngineError::InvalidConfiguration(format!("invalid variable reference {key:?}: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_resource_reference() {
        let v = InterpolatedVariable::parse("aws_instance.web.id").unwrap();
        assert_eq!(v.full_key(), "aws_instance.web.id");
        assert_eq!(
            v.kind(),
            &VariableKind::Resource {
                mode: ResourceMode::Managed,
                resource_type: "aws_instance".to_string(),
                name: "web".to_string(),
                attribute: Some("id".to_string()),
            }
        );
    }

    #[test]
    fn data_resource_reference_keeps_nested_attribute() {
        let v = InterpolatedVariable::parse("data.aws_ami.ubuntu.tags.Name").unwrap();
        match v.kind() {
            VariableKind::Resource {
                mode, attribute, ..
            } => {
                assert_eq!(*mode, ResourceMode::Data);
                assert_eq!(attribute.as_deref(), Some("tags.Name"));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn special_prefixes() {
        assert!(matches!(
            InterpolatedVariable::parse("var.region").unwrap().kind(),
            VariableKind::User { name } if name == "region"
        ));
        assert!(matches!(
            InterpolatedVariable::parse("module.net.vpc_id").unwrap().kind(),
            VariableKind::Module { module, output } if module == "net" && output == "vpc_id"
        ));
        assert!(matches!(
            InterpolatedVariable::parse("count.index").unwrap().kind(),
            VariableKind::Count { .. }
        ));
        assert!(matches!(
            InterpolatedVariable::parse("self.private_ip").unwrap().kind(),
            VariableKind::SelfRef { .. }
        ));
        assert!(matches!(
            InterpolatedVariable::parse("name").unwrap().kind(),
            VariableKind::Simple { .. }
        ));
    }

    #[test]
    fn incomplete_references_are_rejected() {
        assert!(InterpolatedVariable::parse("var").is_err());
        assert!(InterpolatedVariable::parse("module.net").is_err());
        assert!(InterpolatedVariable::parse("data.aws_ami").is_err());
        assert!(InterpolatedVariable::parse("a..b").is_err());
    }
}
