use std::collections::HashMap;
use tfengine::flatmap;
use tfengine::{
    AttributeBuilder, AttributeType, Block, BlockBuilder, DiffAttrType, Dynamic, EngineError,
    InstanceDiff, InstanceState, ResourceAttrDiff, ResourceConfig, UNKNOWN_VARIABLE_VALUE,
};
use uuid::Uuid;

const TRIGGERS: &str = "triggers";

/// Resource that does nothing beyond recording its triggers.
///
/// Any change to `triggers` replaces the instance, which gives it a new id.
pub struct NullResource;

impl NullResource {
    pub fn schema_static() -> Block {
        BlockBuilder::new()
            .attribute(
                AttributeBuilder::string("id")
                    .description("Random identifier assigned on create")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::map(TRIGGERS, AttributeType::String)
                    .description("Arbitrary values that force replacement when changed")
                    .optional()
                    .build(),
            )
            .description("A resource that does nothing")
            .build()
    }

    pub fn diff(state: &InstanceState, config: &ResourceConfig) -> Option<InstanceDiff> {
        let mut diff = InstanceDiff::new();

        if config.is_computed(TRIGGERS) {
            let old = state
                .attributes
                .get("triggers.%")
                .cloned()
                .unwrap_or_default();
            diff = diff.with_attribute(
                "triggers.%",
                ResourceAttrDiff::computed(old)
                    .requires_new()
                    .with_type(DiffAttrType::Input),
            );
        } else {
            let desired = desired_triggers(config);

            for (key, new) in &desired {
                let old = state.attributes.get(key).cloned().unwrap_or_default();
                if &old != new {
                    diff = diff.with_attribute(
                        key.clone(),
                        ResourceAttrDiff::change(old, new.clone())
                            .requires_new()
                            .with_type(DiffAttrType::Input),
                    );
                }
            }

            for (key, old) in &state.attributes {
                if key.starts_with("triggers.") && !desired.contains_key(key) {
                    diff = diff.with_attribute(
                        key.clone(),
                        ResourceAttrDiff::removed(old.clone())
                            .requires_new()
                            .with_type(DiffAttrType::Input),
                    );
                }
            }
        }

        if state.exists() && diff.is_empty() {
            return None;
        }

        // every diff produced here creates or replaces the instance
        let id = ResourceAttrDiff::computed(state.id.clone())
            .requires_new()
            .with_type(DiffAttrType::Output);
        Some(diff.with_attribute("id", id))
    }

    pub fn refresh(state: &InstanceState) -> Option<InstanceState> {
        if !state.exists() {
            return None;
        }
        Some(state.clone())
    }

    pub fn apply(
        state: &InstanceState,
        diff: &InstanceDiff,
    ) -> tfengine::Result<Option<InstanceState>> {
        if diff.destroy {
            return Ok(None);
        }

        let mut new_state = state.merge_diff(diff);

        if let Some((key, _)) = new_state
            .attributes
            .iter()
            .find(|(key, value)| key.as_str() != "id" && value.as_str() == UNKNOWN_VARIABLE_VALUE)
        {
            return Err(EngineError::Provider(format!(
                "{} is not known at apply time",
                key
            )));
        }

        if !state.exists() || diff.requires_new() {
            new_state.id = Uuid::new_v4().to_string();
        }
        new_state
            .attributes
            .insert("id".to_string(), new_state.id.clone());

        Ok(Some(new_state))
    }
}

fn desired_triggers(config: &ResourceConfig) -> HashMap<String, String> {
    match config.get(TRIGGERS) {
        Some(value @ Dynamic::Map(_)) => {
            flatmap::flatten(&HashMap::from([(TRIGGERS.to_string(), value)]))
        }
        _ => HashMap::new(),
    }
}
