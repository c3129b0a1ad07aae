//! Evaluation nodes run by the graph walker during plan and apply
//!
//! Each node does one thing and keeps its result in a public output slot for
//! the walker to pick up.

use crate::config::ResourceMode;
use crate::context::Context;
use crate::error::Result;
use crate::provider::ResourceProvider;
use crate::schema::Block;
use crate::types::InstanceInfo;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// What a node can learn about where it is being evaluated
pub trait EvalContext: Send + Sync {
    /// Module path of the module being evaluated, starting at the root
    fn path(&self) -> Vec<String>;

    /// Context for provider calls made by the node
    fn context(&self) -> Context {
        Context::new()
    }
}

#[async_trait]
pub trait EvalNode: Send {
    async fn eval(&mut self, ctx: &dyn EvalContext) -> Result<()>;
}

/// Fetches the schema of one resource type or data source.
///
/// `output` stays `None` when the provider does not advertise a schema for the
/// type; that is not an error.
pub struct EvalGetResourceSchema {
    pub mode: ResourceMode,
    pub resource_type: String,
    pub provider: Arc<dyn ResourceProvider>,
    pub output: Option<Block>,
}

impl EvalGetResourceSchema {
    pub fn new(
        mode: ResourceMode,
        resource_type: impl Into<String>,
        provider: Arc<dyn ResourceProvider>,
    ) -> Self {
        Self {
            mode,
            resource_type: resource_type.into(),
            provider,
            output: None,
        }
    }

    fn schema_available(&self) -> bool {
        match self.mode {
            ResourceMode::Managed => self
                .provider
                .resources()
                .iter()
                .any(|r| r.name == self.resource_type && r.schema_available),
            ResourceMode::Data => self
                .provider
                .data_sources()
                .iter()
                .any(|d| d.name == self.resource_type && d.schema_available),
        }
    }
}

#[async_trait]
impl EvalNode for EvalGetResourceSchema {
    async fn eval(&mut self, ctx: &dyn EvalContext) -> Result<()> {
        if !self.schema_available() {
            debug!("No {} schema for {}", self.mode, self.resource_type);
            self.output = None;
            return Ok(());
        }

        let context = ctx.context();
        let schema = match self.mode {
            ResourceMode::Managed => {
                self.provider
                    .resource_type_schema(context, &self.resource_type)
                    .await?
            }
            ResourceMode::Data => {
                self.provider
                    .data_source_schema(context, &self.resource_type)
                    .await?
            }
        };

        self.output = Some(schema);
        Ok(())
    }
}

/// Fills the module path of an instance from the evaluation context
pub struct EvalInstanceInfo {
    pub info: InstanceInfo,
}

impl EvalInstanceInfo {
    pub fn new(info: InstanceInfo) -> Self {
        Self { info }
    }
}

#[async_trait]
impl EvalNode for EvalInstanceInfo {
    async fn eval(&mut self, ctx: &dyn EvalContext) -> Result<()> {
        self.info.module_path = ctx.path();
        Ok(())
    }
}
