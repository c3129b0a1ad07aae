pub mod config;
pub mod data_sources;
pub mod error;
pub mod registry;
pub mod resources;

use async_trait::async_trait;
use std::collections::HashMap;
use tfengine::{
    AttributeBuilder, Block, BlockBuilder, Context, DataSourceType, Diagnostics, EngineError,
    InstanceDiff, InstanceInfo, InstanceState, ResourceConfig, ResourceProvider, ResourceType,
};
use tracing::info;

pub use config::{ProviderBlock, ServerFile};
pub use error::ServerConfigError;
pub use registry::{builtin, initialize_providers};

/// Provider whose resources exist only in state
pub struct NullProvider {
    greeting: Option<String>,
}

impl Default for NullProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl NullProvider {
    pub fn new() -> Self {
        Self { greeting: None }
    }

    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    pub fn schema_static() -> Block {
        BlockBuilder::new()
            .attribute(
                AttributeBuilder::string("greeting")
                    .description("Message logged once the provider is configured")
                    .optional()
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl ResourceProvider for NullProvider {
    async fn validate(&self, _ctx: Context, config: &ResourceConfig) -> Diagnostics {
        Self::schema_static().validate_config(config)
    }

    async fn configure(&mut self, _ctx: Context, config: &ResourceConfig) -> tfengine::Result<()> {
        self.greeting = config
            .get("greeting")
            .and_then(|v| v.as_str().map(|s| s.to_string()));

        if let Some(greeting) = &self.greeting {
            info!("null provider configured: {}", greeting);
        }
        Ok(())
    }

    async fn validate_resource(
        &self,
        _ctx: Context,
        resource_type: &str,
        config: &ResourceConfig,
    ) -> Diagnostics {
        match resource_schemas().get(resource_type) {
            Some(schema) => schema.validate_config(config),
            None => {
                let mut diags = Diagnostics::new();
                diags.add_error(
                    format!("Unknown resource: {}", resource_type),
                    None::<String>,
                );
                diags
            }
        }
    }

    async fn diff(
        &self,
        _ctx: Context,
        info: &InstanceInfo,
        state: &InstanceState,
        config: &ResourceConfig,
    ) -> tfengine::Result<Option<InstanceDiff>> {
        match info.resource_type.as_str() {
            "null_resource" => Ok(resources::NullResource::diff(state, config)),
            other => Err(EngineError::ResourceNotFound(other.to_string())),
        }
    }

    async fn refresh(
        &self,
        _ctx: Context,
        info: &InstanceInfo,
        state: &InstanceState,
    ) -> tfengine::Result<Option<InstanceState>> {
        match info.resource_type.as_str() {
            "null_resource" => Ok(resources::NullResource::refresh(state)),
            other => Err(EngineError::ResourceNotFound(other.to_string())),
        }
    }

    async fn apply(
        &self,
        _ctx: Context,
        info: &InstanceInfo,
        state: &InstanceState,
        diff: &InstanceDiff,
    ) -> tfengine::Result<Option<InstanceState>> {
        match info.resource_type.as_str() {
            "null_resource" => resources::NullResource::apply(state, diff),
            other => Err(EngineError::ResourceNotFound(other.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceType> {
        resource_schemas()
            .keys()
            .map(|name| ResourceType::new(name.clone(), true))
            .collect()
    }

    fn data_sources(&self) -> Vec<DataSourceType> {
        data_source_schemas()
            .keys()
            .map(|name| DataSourceType::new(name.clone(), true))
            .collect()
    }

    async fn resource_type_schema(&self, _ctx: Context, name: &str) -> tfengine::Result<Block> {
        resource_schemas()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::ResourceNotFound(name.to_string()))
    }

    async fn data_source_schema(&self, _ctx: Context, name: &str) -> tfengine::Result<Block> {
        data_source_schemas()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::DataSourceNotFound(name.to_string()))
    }
}

fn resource_schemas() -> &'static HashMap<String, Block> {
    static SCHEMAS: std::sync::OnceLock<HashMap<String, Block>> = std::sync::OnceLock::new();

    SCHEMAS.get_or_init(|| {
        let mut schemas = HashMap::new();
        schemas.insert(
            "null_resource".to_string(),
            resources::NullResource::schema_static(),
        );
        schemas
    })
}

fn data_source_schemas() -> &'static HashMap<String, Block> {
    static SCHEMAS: std::sync::OnceLock<HashMap<String, Block>> = std::sync::OnceLock::new();

    SCHEMAS.get_or_init(|| {
        let mut schemas = HashMap::new();
        schemas.insert(
            "null_data_source".to_string(),
            data_sources::NullDataSource::schema_static(),
        );
        schemas
    })
}
