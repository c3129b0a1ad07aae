//! Server configuration file
//!
//! ```hcl
//! listen            = "127.0.0.1:8080"
//! operation_timeout = 300 # seconds, 0 disables
//! log_level         = "info"
//!
//! provider "local" {
//!   builtin = "null"
//!   config {
//!     greeting = "${upper("hi")}"
//!   }
//! }
//! ```
//!
//! Expressions inside a provider `config` block are kept as source text and
//! resolved later by the engine's interpolation, so the same functions are
//! available as in resource configuration.

use crate::error::ServerConfigError;
use hcl::expr::{Expression, TemplateExpr};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tfengine::{Dynamic, LogLevel, ServerConfig};

/// One `provider "<name>" { ... }` block
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderBlock {
    pub name: String,
    /// Built-in provider kind, e.g. `null`
    pub builtin: String,
    pub config: HashMap<String, Dynamic>,
}

impl ProviderBlock {
    pub fn new(name: impl Into<String>, builtin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            builtin: builtin.into(),
            config: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerFile {
    pub listen: Option<SocketAddr>,
    /// Seconds; zero disables the timeout
    pub operation_timeout: Option<u64>,
    pub max_body_size: Option<usize>,
    pub log_level: Option<LogLevel>,
    pub providers: Vec<ProviderBlock>,
}

impl ServerFile {
    /// Configuration used when no file is given: a single `null` provider
    pub fn with_null_provider() -> Self {
        Self {
            providers: vec![ProviderBlock::new("null", "null")],
            ..Self::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ServerConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ServerConfigError> {
        let body: hcl::Body = hcl::from_str(content)?;
        let mut file = ServerFile::default();

        for attr in body.attributes() {
            match attr.key() {
                "listen" => {
                    let value = expect_string(attr.key(), attr.expr())?;
                    let addr = value.parse::<SocketAddr>().map_err(|e| {
                        ServerConfigError::InvalidAttribute {
                            name: "listen".to_string(),
                            message: e.to_string(),
                        }
                    })?;
                    file.listen = Some(addr);
                }
                "operation_timeout" => {
                    file.operation_timeout = Some(expect_u64(attr.key(), attr.expr())?);
                }
                "max_body_size" => {
                    let size = expect_u64(attr.key(), attr.expr())?;
                    let size = usize::try_from(size).map_err(|_| {
                        ServerConfigError::InvalidAttribute {
                            name: "max_body_size".to_string(),
                            message: format!("{size} bytes does not fit in memory"),
                        }
                    })?;
                    file.max_body_size = Some(size);
                }
                "log_level" => {
                    let value = expect_string(attr.key(), attr.expr())?;
                    let level = value.parse::<LogLevel>().map_err(|e| {
                        ServerConfigError::InvalidAttribute {
                            name: "log_level".to_string(),
                            message: e.to_string(),
                        }
                    })?;
                    file.log_level = Some(level);
                }
                other => return Err(ServerConfigError::UnexpectedAttribute(other.to_string())),
            }
        }

        for block in body.blocks() {
            if block.identifier() != "provider" {
                return Err(ServerConfigError::UnexpectedBlock(
                    block.identifier().to_string(),
                ));
            }
            let provider = parse_provider(block)?;
            if file.providers.iter().any(|p| p.name == provider.name) {
                return Err(ServerConfigError::DuplicateProvider(provider.name));
            }
            file.providers.push(provider);
        }

        Ok(file)
    }

    /// Layer the file's settings over `base`
    pub fn server_config(&self, base: ServerConfig) -> ServerConfig {
        let mut config = base;
        if let Some(listen) = self.listen {
            config = config.with_listen(listen);
        }
        match self.operation_timeout {
            Some(0) => config = config.without_operation_timeout(),
            Some(secs) => config = config.with_operation_timeout(Duration::from_secs(secs)),
            None => {}
        }
        if let Some(size) = self.max_body_size {
            config = config.with_max_body_size(size);
        }
        if let Some(level) = self.log_level {
            config = config.with_log_level(level);
        }
        config
    }
}

fn parse_provider(block: &hcl::Block) -> Result<ProviderBlock, ServerConfigError> {
    let name = match block.labels() {
        [label] => label.as_str().to_string(),
        _ => return Err(ServerConfigError::MissingLabel),
    };

    let mut builtin = None;
    for attr in block.body().attributes() {
        match attr.key() {
            "builtin" => builtin = Some(expect_string(attr.key(), attr.expr())?),
            other => return Err(ServerConfigError::UnexpectedAttribute(other.to_string())),
        }
    }
    let builtin = builtin.ok_or_else(|| ServerConfigError::InvalidAttribute {
        name: format!("provider.{name}.builtin"),
        message: "argument is required".to_string(),
    })?;

    let mut config = HashMap::new();
    for inner in block.body().blocks() {
        if inner.identifier() != "config" {
            return Err(ServerConfigError::UnexpectedBlock(
                inner.identifier().to_string(),
            ));
        }
        for attr in inner.body().attributes() {
            config.insert(attr.key().to_string(), expr_to_dynamic(attr.expr())?);
        }
    }

    Ok(ProviderBlock {
        name,
        builtin,
        config,
    })
}

/// Literals become values; anything that needs evaluating is kept as a
/// `${...}` template string.
fn expr_to_dynamic(expr: &Expression) -> Result<Dynamic, ServerConfigError> {
    Ok(match expr {
        Expression::Null => Dynamic::Null,
        Expression::Bool(b) => Dynamic::Bool(*b),
        Expression::Number(n) => match n.as_f64() {
            Some(n) => Dynamic::Number(n),
            None => {
                return Err(ServerConfigError::InvalidAttribute {
                    name: "config".to_string(),
                    message: format!("number {n} out of range"),
                })
            }
        },
        // The parser has already unescaped `$${` and `%%{`; restore them so the
        // engine reads the text as a literal.
        Expression::String(s) => Dynamic::String(s.replace("${", "$${").replace("%{", "%%{")),
        Expression::TemplateExpr(t) => match t.as_ref() {
            TemplateExpr::QuotedString(s) => Dynamic::String(s.clone()),
            TemplateExpr::Heredoc(heredoc) => Dynamic::String(heredoc.template.clone()),
        },
        Expression::Array(items) => Dynamic::List(
            items
                .iter()
                .map(expr_to_dynamic)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Expression::Object(object) => {
            let mut map = HashMap::new();
            for (key, value) in object {
                let key: String = key.clone().into();
                map.insert(key, expr_to_dynamic(value)?);
            }
            Dynamic::Map(map)
        }
        other => Dynamic::String(format!("${{{}}}", other)),
    })
}

fn expect_string(name: &str, expr: &Expression) -> Result<String, ServerConfigError> {
    match expr {
        Expression::String(s) => Ok(s.clone()),
        _ => Err(ServerConfigError::InvalidAttribute {
            name: name.to_string(),
            message: "expected a string literal".to_string(),
        }),
    }
}

fn expect_u64(name: &str, expr: &Expression) -> Result<u64, ServerConfigError> {
    match expr {
        Expression::Number(n) => n.as_u64().ok_or_else(|| ServerConfigError::InvalidAttribute {
            name: name.to_string(),
            message: format!("expected a non-negative integer, got {n}"),
        }),
        _ => Err(ServerConfigError::InvalidAttribute {
            name: name.to_string(),
            message: "expected a number".to_string(),
        }),
    }
}
