//! Built-in functions available to every interpolation

use super::template::number;
use hcl::eval::{Context, FuncArgs, FuncDef, ParamType};
use hcl::{Identifier, Value};

type Func = fn(FuncArgs) -> Result<Value, String>;

pub(crate) fn declare_all(ctx: &mut Context) {
    let string = || ParamType::String;
    let number_param = || ParamType::Number;
    let list = || ParamType::array_of(ParamType::Any);
    let map = || ParamType::object_of(ParamType::Any);
    let collection = || ParamType::one_of(vec![ParamType::String, list(), map()]);

    declare(ctx, "lower", vec![string()], None, lower);
    declare(ctx, "upper", vec![string()], None, upper);
    declare(ctx, "title", vec![string()], None, title);
    declare(ctx, "trimspace", vec![string()], None, trimspace);
    declare(ctx, "join", vec![string(), list()], None, join);
    declare(ctx, "split", vec![string(), string()], None, split);
    declare(ctx, "length", vec![collection()], None, length);
    declare(ctx, "concat", vec![], Some(list()), concat);
    declare(ctx, "element", vec![list(), number_param()], None, element);
    declare(ctx, "lookup", vec![map(), string()], Some(ParamType::Any), lookup);
    declare(ctx, "keys", vec![map()], None, keys);
    declare(ctx, "values", vec![map()], None, values);
    declare(ctx, "replace", vec![string(), string(), string()], None, replace);
    declare(ctx, "coalesce", vec![], Some(ParamType::Any), coalesce);
    declare(ctx, "min", vec![], Some(number_param()), min);
    declare(ctx, "max", vec![], Some(number_param()), max);
    declare(ctx, "abs", vec![number_param()], None, abs);
    declare(ctx, "ceil", vec![number_param()], None, ceil);
    declare(ctx, "floor", vec![number_param()], None, floor);
    declare(ctx, "substr", vec![string(), number_param(), number_param()], None, substr);
    declare(ctx, "contains", vec![list(), ParamType::Any], None, contains);
}

fn declare(
    ctx: &mut Context,
    name: &str,
    params: Vec<ParamType>,
    variadic: Option<ParamType>,
    func: Func,
) {
    let mut builder = FuncDef::builder().params(params);
    if let Some(variadic) = variadic {
        builder = builder.variadic_param(variadic);
    }
    ctx.declare_func(Identifier::unchecked(name), builder.build(func));
}

fn str_arg(args: &FuncArgs, index: usize) -> Result<&str, String> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("argument {} must be a string", index + 1))
}

fn num_arg(args: &FuncArgs, index: usize) -> Result<f64, String> {
    args.get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("argument {} must be a number", index + 1))
}

fn list_arg(args: &FuncArgs, index: usize) -> Result<&Vec<Value>, String> {
    args.get(index)
        .and_then(Value::as_array)
        .ok_or_else(|| format!("argument {} must be a list", index + 1))
}

fn map_arg(args: &FuncArgs, index: usize) -> Result<&hcl::Map<String, Value>, String> {
    args.get(index)
        .and_then(Value::as_object)
        .ok_or_else(|| format!("argument {} must be a map", index + 1))
}

fn lower(args: FuncArgs) -> Result<Value, String> {
    Ok(Value::from(str_arg(&args, 0)?.to_lowercase()))
}

fn upper(args: FuncArgs) -> Result<Value, String> {
    Ok(Value::from(str_arg(&args, 0)?.to_uppercase()))
}

fn title(args: FuncArgs) -> Result<Value, String> {
    let mut out = String::new();
    let mut at_word_start = true;
    for c in str_arg(&args, 0)?.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    Ok(Value::from(out))
}

fn trimspace(args: FuncArgs) -> Result<Value, String> {
    Ok(Value::from(str_arg(&args, 0)?.trim()))
}

fn render(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("cannot convert {other:?} to a string")),
    }
}

fn join(args: FuncArgs) -> Result<Value, String> {
    let separator = str_arg(&args, 0)?;
    let parts = list_arg(&args, 1)?
        .iter()
        .map(render)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::from(parts.join(separator)))
}

fn split(args: FuncArgs) -> Result<Value, String> {
    let separator = str_arg(&args, 0)?;
    let text = str_arg(&args, 1)?;
    if text.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    Ok(Value::Array(
        text.split(separator).map(Value::from).collect(),
    ))
}

fn length(args: FuncArgs) -> Result<Value, String> {
    let len = match args.first() {
        Some(Value::String(s)) => s.chars().count(),
        Some(Value::Array(items)) => items.len(),
        Some(Value::Object(map)) => map.len(),
        _ => return Err("length requires a string, list or map".to_string()),
    };
    Ok(number(len as f64))
}

fn concat(args: FuncArgs) -> Result<Value, String> {
    let mut out = Vec::new();
    for index in 0..args.len() {
        out.extend(list_arg(&args, index)?.iter().cloned());
    }
    Ok(Value::Array(out))
}

fn element(args: FuncArgs) -> Result<Value, String> {
    let items = list_arg(&args, 0)?;
    if items.is_empty() {
        return Err("element cannot index an empty list".to_string());
    }
    let index = num_arg(&args, 1)?;
    if index < 0.0 {
        return Err("element index must not be negative".to_string());
    }
    // wraps around like the modulo-based lookup in count expressions
    Ok(items[(index as usize) % items.len()].clone())
}

fn lookup(args: FuncArgs) -> Result<Value, String> {
    let map = map_arg(&args, 0)?;
    let key = str_arg(&args, 1)?;
    match (map.get(key), args.get(2)) {
        (Some(value), _) => Ok(value.clone()),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => Err(format!("lookup failed to find {key:?}")),
    }
}

fn sorted_entries(map: &hcl::Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn keys(args: FuncArgs) -> Result<Value, String> {
    let map = map_arg(&args, 0)?;
    Ok(Value::Array(
        sorted_entries(map)
            .into_iter()
            .map(|(key, _)| Value::from(key.as_str()))
            .collect(),
    ))
}

fn values(args: FuncArgs) -> Result<Value, String> {
    let map = map_arg(&args, 0)?;
    Ok(Value::Array(
        sorted_entries(map)
            .into_iter()
            .map(|(_, value)| value.clone())
            .collect(),
    ))
}

fn replace(args: FuncArgs) -> Result<Value, String> {
    let text = str_arg(&args, 0)?;
    let search = str_arg(&args, 1)?;
    let replacement = str_arg(&args, 2)?;
    Ok(Value::from(text.replace(search, replacement)))
}

fn coalesce(args: FuncArgs) -> Result<Value, String> {
    args.iter()
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
        .cloned()
        .ok_or_else(|| "no non-null, non-empty-string arguments".to_string())
}

fn fold_numbers(args: &FuncArgs, name: &str, pick: fn(f64, f64) -> f64) -> Result<Value, String> {
    let mut acc: Option<f64> = None;
    for index in 0..args.len() {
        let value = num_arg(args, index)?;
        acc = Some(acc.map_or(value, |current| pick(current, value)));
    }
    acc.map(number)
        .ok_or_else(|| format!("{name} requires at least one argument"))
}

fn min(args: FuncArgs) -> Result<Value, String> {
    fold_numbers(&args, "min", f64::min)
}

fn max(args: FuncArgs) -> Result<Value, String> {
    fold_numbers(&args, "max", f64::max)
}

fn abs(args: FuncArgs) -> Result<Value, String> {
    Ok(number(num_arg(&args, 0)?.abs()))
}

fn ceil(args: FuncArgs) -> Result<Value, String> {
    Ok(number(num_arg(&args, 0)?.ceil()))
}

fn floor(args: FuncArgs) -> Result<Value, String> {
    Ok(number(num_arg(&args, 0)?.floor()))
}

/// `substr(text, offset, length)`; a length of -1 means "to the end"
fn substr(args: FuncArgs) -> Result<Value, String> {
    let chars: Vec<char> = str_arg(&args, 0)?.chars().collect();
    let offset = num_arg(&args, 1)?;
    let length = num_arg(&args, 2)?;

    let start = if offset < 0.0 {
        chars.len().saturating_sub((-offset) as usize)
    } else {
        offset as usize
    };
    if start > chars.len() {
        return Err("offset cannot be larger than the length of the string".to_string());
    }

    let end = if length < 0.0 {
        chars.len()
    } else {
        start.saturating_add(length as usize).min(chars.len())
    };

    Ok(Value::from(chars[start..end].iter().collect::<String>()))
}

fn contains(args: FuncArgs) -> Result<Value, String> {
    let items = list_arg(&args, 0)?;
    let needle = args.get(1).cloned().unwrap_or(Value::Null);
    Ok(Value::Bool(items.contains(&needle)))
}

#[cfg(test)]
mod tests {
    use crate::config::template::{parse, ParsedString};
    use crate::types::Dynamic;
    use std::collections::HashMap;

    fn eval(source: &str) -> Dynamic {
        match parse(source).unwrap() {
            ParsedString::Template(node) => node.evaluate(&HashMap::new()).unwrap(),
            ParsedString::Literal(text) => Dynamic::String(text),
        }
    }

    #[test]
    fn string_functions() {
        assert_eq!(eval(r#"${lower("ABC")}"#), Dynamic::from("abc"));
        assert_eq!(eval(r#"${upper("abc")}"#), Dynamic::from("ABC"));
        assert_eq!(eval(r#"${title("hello world")}"#), Dynamic::from("Hello World"));
        assert_eq!(eval(r#"${trimspace("  x ")}"#), Dynamic::from("x"));
        assert_eq!(eval(r#"${replace("a-b-c", "-", "_")}"#), Dynamic::from("a_b_c"));
        assert_eq!(eval(r#"${substr("hello", 1, 3)}"#), Dynamic::from("ell"));
        assert_eq!(eval(r#"${substr("hello", 2, -1)}"#), Dynamic::from("llo"));
        assert_eq!(
            eval(r#"${substr("hello", 1, 18446744073709551615)}"#),
            Dynamic::from("ello")
        );
    }

    #[test]
    fn join_and_split() {
        assert_eq!(eval(r#"${join(",", ["a", "b"])}"#), Dynamic::from("a,b"));
        assert_eq!(
            eval(r#"${split(",", "a,b")}"#),
            Dynamic::from(vec!["a", "b"])
        );
    }

    #[test]
    fn collection_functions() {
        assert_eq!(eval(r#"${length(["a", "b", "c"])}"#), Dynamic::Number(3.0));
        assert_eq!(
            eval(r#"${concat(["a"], ["b", "c"])}"#),
            Dynamic::from(vec!["a", "b", "c"])
        );
        assert_eq!(eval(r#"${element(["a", "b"], 3)}"#), Dynamic::from("b"));
        assert_eq!(eval(r#"${lookup({ a = "1" }, "b", "dflt")}"#), Dynamic::from("dflt"));
        assert_eq!(eval(r#"${keys({ b = 1, a = 2 })}"#), Dynamic::from(vec!["a", "b"]));
        assert_eq!(eval(r#"${contains(["a", "b"], "b")}"#), Dynamic::Bool(true));
        assert_eq!(eval(r#"${coalesce("", "x")}"#), Dynamic::from("x"));
    }

    #[test]
    fn numeric_functions() {
        assert_eq!(eval("${min(3, 1, 2)}"), Dynamic::Number(1.0));
        assert_eq!(eval("${max(3, 1, 2)}"), Dynamic::Number(3.0));
        assert_eq!(eval("${abs(-4)}"), Dynamic::Number(4.0));
        assert_eq!(eval("${ceil(1.2)}"), Dynamic::Number(2.0));
        assert_eq!(eval("${floor(1.8)}"), Dynamic::Number(1.0));
    }

    #[test]
    fn lookup_without_default_fails() {
        let ParsedString::Template(node) = parse(r#"${lookup({ a = "1" }, "b")}"#).unwrap() else {
            panic!("expected template");
        };
        assert!(node.evaluate(&HashMap::new()).is_err());
    }
}
