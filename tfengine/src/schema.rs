//! Schema types and builders
//!
//! A provider describes each resource type and data source as a [`Block`] of
//! attributes and nested blocks. Schemas are optional: a provider may list a
//! type without advertising one.

use crate::attribute_type::AttributeType;
use crate::config::ResourceConfig;
use crate::types::{Diagnostics, Dynamic};
use std::collections::HashMap;

/// Block represents a configuration block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
}

/// Attribute represents a single configuration attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
}

/// NestedBlock represents a nested configuration block
#[derive(Debug, Clone, PartialEq)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: usize,
    /// Zero means unlimited
    pub max_items: usize,
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingMode {
    Single,
    List,
    Set,
    Map,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn nested_block(&self, type_name: &str) -> Option<&NestedBlock> {
        self.block_types.iter().find(|b| b.type_name == type_name)
    }

    /// Check a resolved configuration against this block.
    ///
    /// Unknown values satisfy required attributes and every type check; they
    /// are re-validated once known.
    pub fn validate_config(&self, config: &ResourceConfig) -> Diagnostics {
        let mut diags = Diagnostics::new();
        self.validate_values(&config.config, "", &mut diags);
        diags
    }

    fn validate_values(
        &self,
        values: &HashMap<String, Dynamic>,
        prefix: &str,
        diags: &mut Diagnostics,
    ) {
        for attr in &self.attributes {
            let path = format!("{prefix}{}", attr.name);
            let value = values.get(&attr.name).filter(|v| !v.is_null());

            match value {
                None if attr.required => diags.add_error(
                    "Missing required argument",
                    Some(format!("The argument \"{path}\" is required")),
                ),
                None => {}
                Some(_) if attr.computed && !attr.optional && !attr.required => diags.add_error(
                    "Value for unconfigurable attribute",
                    Some(format!("\"{path}\" is computed and cannot be set")),
                ),
                Some(v) if !attr.r#type.accepts(v) => diags.add_error(
                    "Incorrect attribute value type",
                    Some(format!(
                        "\"{path}\" must be {}, got {}",
                        attr.r#type,
                        v.type_name()
                    )),
                ),
                Some(_) => {}
            }
        }

        for nested in &self.block_types {
            let path = format!("{prefix}{}", nested.type_name);
            nested.validate(values.get(&nested.type_name), &path, diags);
        }

        let mut unexpected: Vec<&String> = values
            .keys()
            .filter(|k| self.attribute(k).is_none() && self.nested_block(k).is_none())
            .collect();
        unexpected.sort();
        for key in unexpected {
            diags.add_error(
                "Unsupported argument",
                Some(format!("An argument named \"{prefix}{key}\" is not expected here")),
            );
        }
    }
}

impl NestedBlock {
    fn validate(&self, value: Option<&Dynamic>, path: &str, diags: &mut Diagnostics) {
        let items: Vec<(String, &Dynamic)> = match (self.nesting, value) {
            (_, None | Some(Dynamic::Null)) => Vec::new(),
            (_, Some(Dynamic::Unknown)) => return,
            (NestingMode::Single, Some(v)) => vec![(format!("{path}."), v)],
            (NestingMode::List | NestingMode::Set, Some(Dynamic::List(list))) => list
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("{path}.{i}."), v))
                .collect(),
            (NestingMode::Map, Some(Dynamic::Map(map))) => map
                .iter()
                .map(|(k, v)| (format!("{path}.{k}."), v))
                .collect(),
            (_, Some(other)) => {
                diags.add_error(
                    "Invalid block",
                    Some(format!("\"{path}\" cannot be a {}", other.type_name())),
                );
                return;
            }
        };

        if items.len() < self.min_items {
            diags.add_error(
                "Insufficient blocks",
                Some(format!(
                    "At least {} \"{path}\" blocks are required",
                    self.min_items
                )),
            );
        }
        if self.max_items > 0 && items.len() > self.max_items {
            diags.add_error(
                "Too many blocks",
                Some(format!(
                    "No more than {} \"{path}\" blocks are allowed",
                    self.max_items
                )),
            );
        }

        for (prefix, item) in items {
            match item {
                Dynamic::Map(values) => self.block.validate_values(values, &prefix, diags),
                Dynamic::Unknown => {}
                other => diags.add_error(
                    "Invalid block",
                    Some(format!(
                        "\"{}\" must be a block, got {}",
                        prefix.trim_end_matches('.'),
                        other.type_name()
                    )),
                ),
            }
        }
    }
}

/// AttributeBuilder provides fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
            },
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, AttributeType::Number)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn list(name: &str, element: AttributeType) -> Self {
        Self::new(name, AttributeType::List(Box::new(element)))
    }

    pub fn map(name: &str, element: AttributeType) -> Self {
        Self::new(name, AttributeType::Map(Box::new(element)))
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// BlockBuilder provides fluent API for building schema blocks
#[derive(Default)]
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.block.attributes.push(attr);
        self
    }

    /// Add a nested block type
    pub fn block(
        mut self,
        type_name: &str,
        nesting: NestingMode,
        block: Block,
        min_items: usize,
        max_items: usize,
    ) -> Self {
        self.block.block_types.push(NestedBlock {
            type_name: type_name.to_string(),
            block,
            nesting,
            min_items,
            max_items,
        });
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.block.description = desc.to_string();
        self
    }

    pub fn build(self) -> Block {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance_schema() -> Block {
        BlockBuilder::new()
            .description("Test resource schema")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("name").required().build())
            .attribute(AttributeBuilder::number("port").optional().build())
            .attribute(
                AttributeBuilder::map("tags", AttributeType::String)
                    .optional()
                    .build(),
            )
            .block(
                "disk",
                NestingMode::List,
                BlockBuilder::new()
                    .attribute(AttributeBuilder::number("size").required().build())
                    .build(),
                0,
                2,
            )
            .build()
    }

    fn config(pairs: Vec<(&str, Dynamic)>) -> ResourceConfig {
        ResourceConfig::from_map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::string("name")
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn valid_config_has_no_diagnostics() {
        let diags = instance_schema().validate_config(&config(vec![
            ("name", Dynamic::from("web")),
            ("port", Dynamic::from("8080")),
        ]));
        assert!(!diags.has_errors(), "{:?}", diags.error_messages());
    }

    #[test]
    fn missing_required_attribute() {
        let diags = instance_schema().validate_config(&config(vec![]));
        assert_eq!(
            diags.error_messages(),
            vec!["Missing required argument: The argument \"name\" is required"]
        );
    }

    #[test]
    fn unknown_value_satisfies_required() {
        let diags = instance_schema().validate_config(&config(vec![("name", Dynamic::Unknown)]));
        assert!(!diags.has_errors());
    }

    #[test]
    fn unexpected_and_computed_attributes_are_errors() {
        let diags = instance_schema().validate_config(&config(vec![
            ("name", Dynamic::from("web")),
            ("id", Dynamic::from("i-1")),
            ("colour", Dynamic::from("red")),
        ]));
        assert_eq!(diags.errors.len(), 2);
        assert_eq!(diags.errors[0].summary, "Value for unconfigurable attribute");
        assert_eq!(diags.errors[1].summary, "Unsupported argument");
    }

    #[test]
    fn type_mismatch_is_reported() {
        let diags = instance_schema().validate_config(&config(vec![
            ("name", Dynamic::from("web")),
            ("port", Dynamic::from("eighty")),
        ]));
        assert_eq!(diags.errors[0].summary, "Incorrect attribute value type");
    }

    #[test]
    fn nested_blocks_are_validated() {
        let disk = |size: Dynamic| Dynamic::Map(HashMap::from([("size".to_string(), size)]));
        let diags = instance_schema().validate_config(&config(vec![
            ("name", Dynamic::from("web")),
            (
                "disk",
                Dynamic::List(vec![
                    disk(Dynamic::Number(10.0)),
                    Dynamic::Map(HashMap::new()),
                    disk(Dynamic::Number(30.0)),
                ]),
            ),
        ]));

        let summaries: Vec<&str> = diags.errors.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Too many blocks", "Missing required argument"]);
        assert!(diags.errors[1].detail.contains("disk.1.size"));
    }
}
