//! Embedded `${...}` expressions inside configuration strings
//!
//! Strings are parsed as HCL templates. Parsing happens once per string when a
//! [`RawConfig`](super::RawConfig) is built; evaluation happens on every
//! interpolation against a fresh [`hcl::eval::Context`].

use super::funcs;
use super::variable::InterpolatedVariable;
use crate::error::{EngineError, Result};
use crate::types::Dynamic;
use hcl::eval::Evaluate;
use hcl::template::{Directive, Element};
use hcl::{Expression, Identifier, ObjectKey, Operation, Template, TemplateExpr, TraversalOperator};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

/// Outcome of parsing one configuration string
#[derive(Debug, Clone)]
pub(crate) enum ParsedString {
    /// No interpolation; carries the unescaped text
    Literal(String),
    Template(TemplateNode),
}

/// A string holding at least one interpolation or directive
#[derive(Debug, Clone)]
pub(crate) struct TemplateNode {
    source: String,
    template: Template,
    variables: Vec<InterpolatedVariable>,
}

pub(crate) fn parse(source: &str) -> Result<ParsedString> {
    if !source.contains("${") && !source.contains("%{") {
        return Ok(ParsedString::Literal(source.to_string()));
    }

    let template = Template::from_expr(&TemplateExpr::QuotedString(source.to_string()))
        .map_err(|e| EngineError::TemplateParse {
            source_text: source.to_string(),
            message: e.to_string(),
        })?;

    let dynamic = template
        .elements()
        .iter()
        .any(|element| !matches!(element, Element::Literal(_)));

    if !dynamic {
        let text = template
            .elements()
            .iter()
            .filter_map(|element| match element {
                Element::Literal(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        return Ok(ParsedString::Literal(text));
    }

    let mut collector = ReferenceCollector::default();
    collector.template(&template)?;

    let mut variables: Vec<InterpolatedVariable> = Vec::new();
    for path in collector.found {
        let variable = InterpolatedVariable::from_segments(&path)?;
        if !variables.contains(&variable) {
            variables.push(variable);
        }
    }

    Ok(ParsedString::Template(TemplateNode {
        source: source.to_string(),
        template,
        variables,
    }))
}

impl TemplateNode {
    pub(crate) fn variables(&self) -> &[InterpolatedVariable] {
        &self.variables
    }

    /// Evaluate against `bindings`.
    ///
    /// Returns [`Dynamic::Unknown`] without evaluating when any referenced
    /// variable is missing from `bindings` or is (or contains) an unknown value.
    pub(crate) fn evaluate(&self, bindings: &HashMap<String, Dynamic>) -> Result<Dynamic> {
        let mut known: Vec<(&InterpolatedVariable, &Dynamic)> = Vec::new();
        for variable in &self.variables {
            match bindings.get(variable.full_key()) {
                Some(value) if !value.contains_unknown() => known.push((variable, value)),
                _ => return Ok(Dynamic::Unknown),
            }
        }

        let mut ctx = hcl::eval::Context::new();
        funcs::declare_all(&mut ctx);
        for (root, value) in scope(&known) {
            ctx.declare_var(Identifier::unchecked(root), value);
        }

        let failed = |message: String| {
            EngineError::Interpolation(format!("{:?}: {}", self.source, message))
        };

        // Integer division by zero panics inside the evaluator.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            // A lone "${expr}" keeps the expression's type; anything else renders to a string.
            match self.template.elements() {
                [Element::Interpolation(interpolation)] => {
                    interpolation.expr.evaluate(&ctx).map(from_hcl)
                }
                _ => self.template.evaluate(&ctx).map(Dynamic::String),
            }
        }));

        match outcome {
            Ok(result) => result.map_err(|e| failed(e.to_string())),
            Err(payload) => Err(failed(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "evaluation aborted".to_string()
    }
}

/// Nest every bound full key under its root name: `var.a` and `var.b` become
/// `var = { a = ..., b = ... }`. Shorter keys are placed first so more specific
/// bindings refine them.
fn scope(known: &[(&InterpolatedVariable, &Dynamic)]) -> HashMap<String, hcl::Value> {
    let mut ordered: Vec<(Vec<&str>, &Dynamic)> = known
        .iter()
        .map(|(variable, value)| (variable.segments().collect(), *value))
        .collect();
    ordered.sort_by_key(|(segments, _)| segments.len());

    let mut roots: HashMap<String, hcl::Value> = HashMap::new();
    for (segments, value) in ordered {
        let Some((root, path)) = segments.split_first() else {
            continue;
        };
        let slot = roots
            .entry(root.to_string())
            .or_insert_with(|| hcl::Value::Object(hcl::value::Map::new()));
        insert_path(slot, path, to_hcl(value));
    }
    roots
}

fn insert_path(slot: &mut hcl::Value, path: &[&str], value: hcl::Value) {
    let Some((head, tail)) = path.split_first() else {
        *slot = value;
        return;
    };

    if !matches!(slot, hcl::Value::Object(_)) {
        *slot = hcl::Value::Object(hcl::value::Map::new());
    }
    if let hcl::Value::Object(map) = slot {
        let child = map
            .entry(head.to_string())
            .or_insert_with(|| hcl::Value::Object(hcl::value::Map::new()));
        insert_path(child, tail, value);
    }
}

/// Dotted attribute paths of every free reference inside a template.
///
/// Names bound by `for` expressions and directives are excluded while their
/// body is visited.
#[derive(Default)]
struct ReferenceCollector {
    scope: Vec<String>,
    found: Vec<Vec<String>>,
}

impl ReferenceCollector {
    fn template(&mut self, template: &Template) -> Result<()> {
        for element in template.elements() {
            match element {
                Element::Interpolation(interpolation) => self.expr(&interpolation.expr)?,
                Element::Directive(Directive::If(directive)) => {
                    self.expr(&directive.cond_expr)?;
                    self.template(&directive.true_template)?;
                    if let Some(false_template) = &directive.false_template {
                        self.template(false_template)?;
                    }
                }
                Element::Directive(Directive::For(directive)) => {
                    self.expr(&directive.collection_expr)?;
                    let bound = self.bind(directive.key_var.as_ref(), &directive.value_var);
                    self.template(&directive.template)?;
                    self.unbind(bound);
                }
                Element::Literal(_) => {}
            }
        }
        Ok(())
    }

    fn expr(&mut self, expr: &Expression) -> Result<()> {
        match expr {
            Expression::Variable(variable) => self.record(vec![variable.as_str().to_string()]),
            Expression::Traversal(traversal) => {
                if let Expression::Variable(variable) = &traversal.expr {
                    let mut path = vec![variable.as_str().to_string()];
                    for operator in &traversal.operators {
                        match operator {
                            TraversalOperator::GetAttr(name) => path.push(name.as_str().to_string()),
                            _ => break,
                        }
                    }
                    self.record(path);
                } else {
                    self.expr(&traversal.expr)?;
                }
                for operator in &traversal.operators {
                    if let TraversalOperator::Index(index) = operator {
                        self.expr(index)?;
                    }
                }
            }
            Expression::Array(items) => {
                for item in items {
                    self.expr(item)?;
                }
            }
            Expression::Object(object) => {
                for (key, value) in object {
                    if let ObjectKey::Expression(key_expr) = key {
                        self.expr(key_expr)?;
                    }
                    self.expr(value)?;
                }
            }
            Expression::TemplateExpr(template_expr) => {
                let template = Template::from_expr(template_expr).map_err(|e| {
                    EngineError::TemplateParse {
                        source_text: template_expr.to_string(),
                        message: e.to_string(),
                    }
                })?;
                self.template(&template)?;
            }
            Expression::FuncCall(call) => {
                for arg in &call.args {
                    self.expr(arg)?;
                }
            }
            Expression::Parenthesis(inner) => self.expr(inner)?,
            Expression::Conditional(cond) => {
                self.expr(&cond.cond_expr)?;
                self.expr(&cond.true_expr)?;
                self.expr(&cond.false_expr)?;
            }
            Expression::Operation(operation) => match &**operation {
                Operation::Binary(binary) => {
                    self.expr(&binary.lhs_expr)?;
                    self.expr(&binary.rhs_expr)?;
                }
                Operation::Unary(unary) => self.expr(&unary.expr)?,
            },
            Expression::ForExpr(for_expr) => {
                self.expr(&for_expr.collection_expr)?;
                let bound = self.bind(for_expr.key_var.as_ref(), &for_expr.value_var);
                if let Some(key_expr) = &for_expr.key_expr {
                    self.expr(key_expr)?;
                }
                self.expr(&for_expr.value_expr)?;
                if let Some(cond_expr) = &for_expr.cond_expr {
                    self.expr(cond_expr)?;
                }
                self.unbind(bound);
            }
            _ => {}
        }
        Ok(())
    }

    fn record(&mut self, path: Vec<String>) {
        if self.scope.iter().any(|name| *name == path[0]) {
            return;
        }
        self.found.push(path);
    }

    fn bind(&mut self, key_var: Option<&Identifier>, value_var: &Identifier) -> usize {
        let mut count = 1;
        if let Some(key_var) = key_var {
            self.scope.push(key_var.as_str().to_string());
            count += 1;
        }
        self.scope.push(value_var.as_str().to_string());
        count
    }

    fn unbind(&mut self, count: usize) {
        let keep = self.scope.len().saturating_sub(count);
        self.scope.truncate(keep);
    }
}

/// Integral values become HCL integers so they render as "3", not "3.0"
pub(crate) fn number(value: f64) -> hcl::Value {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < (i64::MAX as f64) {
        hcl::Value::Number(hcl::Number::from(value as i64))
    } else {
        hcl::Number::from_f64(value).map_or(hcl::Value::Null, hcl::Value::Number)
    }
}

pub(crate) fn to_hcl(value: &Dynamic) -> hcl::Value {
    match value {
        Dynamic::Null => hcl::Value::Null,
        Dynamic::Bool(b) => hcl::Value::Bool(*b),
        Dynamic::Number(n) => number(*n),
        Dynamic::String(s) => hcl::Value::String(s.clone()),
        Dynamic::List(items) => hcl::Value::Array(items.iter().map(to_hcl).collect()),
        Dynamic::Map(map) => hcl::Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), to_hcl(value)))
                .collect(),
        ),
        // unknown values never reach an evaluation context
        Dynamic::Unknown => hcl::Value::Null,
    }
}

pub(crate) fn from_hcl(value: hcl::Value) -> Dynamic {
    match value {
        hcl::Value::Null => Dynamic::Null,
        hcl::Value::Bool(b) => Dynamic::Bool(b),
        hcl::Value::Number(n) => n.as_f64().map_or(Dynamic::Null, Dynamic::Number),
        hcl::Value::String(s) => Dynamic::String(s),
        hcl::Value::Array(items) => Dynamic::List(items.into_iter().map(from_hcl).collect()),
        hcl::Value::Object(map) => Dynamic::Map(
            map.into_iter()
                .map(|(key, value)| (key, from_hcl(value)))
                .collect(),
        ),
    }
}
