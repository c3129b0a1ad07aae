//! Flattened string form of nested values, as stored in instance state
//!
//! Lists become `name.#` plus `name.<index>` entries, maps become `name.%` plus
//! `name.<key>` entries. Nulls are dropped.

use crate::types::{Dynamic, UNKNOWN_VARIABLE_VALUE};
use std::collections::HashMap;

pub fn flatten(values: &HashMap<String, Dynamic>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for (key, value) in values {
        flatten_into(&mut out, key, value);
    }
    out
}

fn flatten_into(out: &mut HashMap<String, String>, prefix: &str, value: &Dynamic) {
    match value {
        Dynamic::Null => {}
        Dynamic::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Dynamic::Number(n) => {
            out.insert(prefix.to_string(), format_number(*n));
        }
        Dynamic::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Dynamic::Unknown => {
            out.insert(prefix.to_string(), UNKNOWN_VARIABLE_VALUE.to_string());
        }
        Dynamic::List(items) => {
            out.insert(format!("{prefix}.#"), items.len().to_string());
            for (i, item) in items.iter().enumerate() {
                flatten_into(out, &format!("{prefix}.{i}"), item);
            }
        }
        Dynamic::Map(map) => {
            out.insert(format!("{prefix}.%"), map.len().to_string());
            for (key, item) in map {
                flatten_into(out, &format!("{prefix}.{key}"), item);
            }
        }
    }
}

/// Integral numbers render without a fractional part
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < (i64::MAX as f64) {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}
