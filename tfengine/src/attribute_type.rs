use crate::types::Dynamic;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>), // Ordered, allows duplicates
    Set(Box<AttributeType>),  // Unordered, no duplicates
    Map(Box<AttributeType>),  // String keys only
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    /// Whether `value` can be converted to this type.
    ///
    /// Primitives are weakly typed the way configuration strings are: "8080"
    /// is a valid number and "true" a valid bool. Null and unknown values are
    /// always accepted.
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null | Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_) | Dynamic::Number(_) | Dynamic::Bool(_)) => {
                true
            }
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Number, Dynamic::String(s)) => s.trim().parse::<f64>().is_ok(),
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::Bool, Dynamic::String(s)) => {
                matches!(s.as_str(), "true" | "false" | "1" | "0")
            }
            (AttributeType::List(elem) | AttributeType::Set(elem), Dynamic::List(items)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            (AttributeType::Map(elem), Dynamic::Map(map)) => map.values().all(|v| elem.accepts(v)),
            (AttributeType::Object(fields), Dynamic::Map(map)) => map
                .iter()
                .all(|(k, v)| fields.get(k).is_some_and(|t| t.accepts(v))),
            _ => false,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => f.write_str("string"),
            AttributeType::Number => f.write_str("number"),
            AttributeType::Bool => f.write_str("bool"),
            AttributeType::List(elem) => write!(f, "list({elem})"),
            AttributeType::Set(elem) => write!(f, "set({elem})"),
            AttributeType::Map(elem) => write!(f, "map({elem})"),
            AttributeType::Object(_) => f.write_str("object"),
        }
    }
}
