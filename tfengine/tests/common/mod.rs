//! Mock "aws" provider shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tfengine::{
    AttributeBuilder, AttributeType, Block, BlockBuilder, Context, DataSourceType, Diagnostics,
    DiffAttrType, Dynamic, EngineError, InstanceDiff, InstanceInfo, InstanceState,
    ResourceAttrDiff, ResourceConfig, ResourceProvider, ResourceType, Result,
};

#[derive(Default)]
pub struct AwsProvider {
    pub diff_calls: Arc<AtomicUsize>,
}

impl AwsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diff_calls(&self) -> Arc<AtomicUsize> {
        self.diff_calls.clone()
    }
}

pub fn instance_schema() -> Block {
    BlockBuilder::new()
        .attribute(AttributeBuilder::string("id").computed().build())
        .attribute(AttributeBuilder::string("name").required().build())
        .attribute(AttributeBuilder::string("ami").optional().build())
        .attribute(
            AttributeBuilder::map("tags", AttributeType::String)
                .optional()
                .build(),
        )
        .build()
}

fn render(value: &Dynamic) -> String {
    match value {
        Dynamic::String(s) => s.clone(),
        Dynamic::Number(n) => n.to_string(),
        Dynamic::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}

#[async_trait]
impl ResourceProvider for AwsProvider {
    async fn configure(&mut self, _ctx: Context, _config: &ResourceConfig) -> Result<()> {
        Ok(())
    }

    async fn validate_resource(
        &self,
        _ctx: Context,
        resource_type: &str,
        config: &ResourceConfig,
    ) -> Diagnostics {
        match resource_type {
            "aws_instance" | "aws_slow" | "aws_broken" => {
                let mut diags = instance_schema().validate_config(config);
                if config.get("ami").is_some_and(|v| v.as_str() == Some("ami-deprecated")) {
                    diags.add_warning("ami-deprecated is deprecated", None::<String>);
                }
                diags
            }
            other => {
                let mut diags = Diagnostics::new();
                diags.add_error(format!("unknown resource type {other}"), None::<String>);
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
    ) -> Result<Option<InstanceDiff>> {
        self.diff_calls.fetch_add(1, Ordering::SeqCst);

        match info.resource_type.as_str() {
            "aws_slow" => tokio::time::sleep(Duration::from_secs(10)).await,
            "aws_broken" => return Err(EngineError::Provider("api unavailable".to_string())),
            _ => {}
        }

        let mut diff = InstanceDiff::new();
        for (key, value) in &config.config {
            let old = state.attributes.get(key).cloned().unwrap_or_default();
            if config.is_computed(key) {
                diff = diff.with_attribute(key.clone(), ResourceAttrDiff::computed(old));
                continue;
            }
            let new = render(value);
            if old != new {
                let mut attr = ResourceAttrDiff::change(old, new).with_type(DiffAttrType::Input);
                if key == "ami" {
                    attr = attr.requires_new();
                }
                diff = diff.with_attribute(key.clone(), attr);
            }
        }

        if diff.is_empty() {
            Ok(None)
        } else {
            Ok(Some(diff))
        }
    }

    async fn refresh(
        &self,
        _ctx: Context,
        _info: &InstanceInfo,
        state: &InstanceState,
    ) -> Result<Option<InstanceState>> {
        if state.id == "gone" {
            return Ok(None);
        }
        Ok(Some(state.clone()))
    }

    async fn apply(
        &self,
        _ctx: Context,
        info: &InstanceInfo,
        state: &InstanceState,
        diff: &InstanceDiff,
    ) -> Result<Option<InstanceState>> {
        if info.resource_type == "aws_broken" {
            return Err(EngineError::Provider("api unavailable".to_string()));
        }
        if diff.destroy {
            return Ok(None);
        }

        let mut new_state = state.merge_diff(diff);
        if new_state.id.is_empty() {
            new_state.id = "i-new".to_string();
        }
        new_state
            .ephemeral
            .conn_info
            .insert("host".to_string(), "10.0.0.1".to_string());
        Ok(Some(new_state))
    }

    fn resources(&self) -> Vec<ResourceType> {
        vec![
            ResourceType::new("aws_instance", true),
            ResourceType::new("aws_slow", false),
            ResourceType::new("aws_broken", false),
        ]
    }

    fn data_sources(&self) -> Vec<DataSourceType> {
        vec![DataSourceType::new("aws_ami", false)]
    }

    async fn resource_type_schema(&self, _ctx: Context, name: &str) -> Result<Block> {
        match name {
            "aws_instance" => Ok(instance_schema()),
            other => Err(EngineError::ResourceNotFound(other.to_string())),
        }
    }

    async fn data_source_schema(&self, _ctx: Context, name: &str) -> Result<Block> {
        Err(EngineError::DataSourceNotFound(name.to_string()))
    }
}
