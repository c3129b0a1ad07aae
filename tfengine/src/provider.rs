use crate::config::ResourceConfig;
use crate::context::Context;
use crate::diff::InstanceDiff;
use crate::error::Result;
use crate::schema::Block;
use crate::types::{Diagnostics, InstanceInfo, InstanceState};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A resource type exposed by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    pub name: String,
    /// Whether [`ResourceProvider::resource_type_schema`] can describe it
    pub schema_available: bool,
}

/// A data source exposed by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceType {
    pub name: String,
    pub schema_available: bool,
}

impl ResourceType {
    pub fn new(name: impl Into<String>, schema_available: bool) -> Self {
        Self {
            name: name.into(),
            schema_available,
        }
    }
}

impl DataSourceType {
    pub fn new(name: impl Into<String>, schema_available: bool) -> Self {
        Self {
            name: name.into(),
            schema_available,
        }
    }
}

/// ResourceProvider is the contract every provider implements.
///
/// Every call gets a request-scoped [`Context`]; long running work should stop
/// once it is cancelled. The server enforces the deadline regardless.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Validate the provider's own configuration
    async fn validate(&self, _ctx: Context, _config: &ResourceConfig) -> Diagnostics {
        Diagnostics::new()
    }

    /// Called once at startup with the validated provider configuration
    async fn configure(&mut self, ctx: Context, config: &ResourceConfig) -> Result<()>;

    async fn validate_resource(
        &self,
        ctx: Context,
        resource_type: &str,
        config: &ResourceConfig,
    ) -> Diagnostics;

    /// `None` means there is nothing to change
    async fn diff(
        &self,
        ctx: Context,
        info: &InstanceInfo,
        state: &InstanceState,
        config: &ResourceConfig,
    ) -> Result<Option<InstanceDiff>>;

    async fn refresh(
        &self,
        ctx: Context,
        info: &InstanceInfo,
        state: &InstanceState,
    ) -> Result<Option<InstanceState>>;

    /// `None` means the resource no longer exists
    async fn apply(
        &self,
        ctx: Context,
        info: &InstanceInfo,
        state: &InstanceState,
        diff: &InstanceDiff,
    ) -> Result<Option<InstanceState>>;

    fn resources(&self) -> Vec<ResourceType>;

    fn data_sources(&self) -> Vec<DataSourceType> {
        Vec::new()
    }

    async fn resource_type_schema(&self, ctx: Context, name: &str) -> Result<Block>;

    async fn data_source_schema(&self, ctx: Context, name: &str) -> Result<Block>;
}

/// Registered providers by name. Built once at startup, read-only afterwards.
pub type ProviderMap = HashMap<String, Arc<dyn ResourceProvider>>;
