//! JSON wire messages and their conversions to and from domain types

use crate::config::{RawConfig, ResourceConfig};
use crate::context::Context;
use crate::diff::{DiffAttrType, InstanceDiff, ResourceAttrDiff};
use crate::error::{EngineError, Result};
use crate::provider::ResourceProvider;
use crate::types::{Dynamic, EphemeralState, InstanceInfo, InstanceState};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Go clients encode nil slices and maps as `null`; read those as empty
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceInfoMessage {
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub module_path: Vec<String>,
    pub resource_name: String,
}

impl From<&InstanceInfo> for InstanceInfoMessage {
    fn from(info: &InstanceInfo) -> Self {
        Self {
            id: info.id.clone(),
            module_path: info.module_path.clone(),
            resource_name: info.resource_type.clone(),
        }
    }
}

impl From<InstanceInfoMessage> for InstanceInfo {
    fn from(msg: InstanceInfoMessage) -> Self {
        Self {
            id: msg.id,
            module_path: msg.module_path,
            resource_type: msg.resource_name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EphemeralMessage {
    #[serde(deserialize_with = "null_as_default")]
    pub connection_info: HashMap<String, String>,
}

/// Instance state on the wire. Ephemeral connection info travels in both
/// directions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceStateMessage {
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub ephemeral: EphemeralMessage,
    #[serde(deserialize_with = "null_as_default")]
    pub meta: HashMap<String, String>,
}

impl From<&InstanceState> for InstanceStateMessage {
    fn from(state: &InstanceState) -> Self {
        Self {
            id: state.id.clone(),
            attributes: state.attributes.clone(),
            ephemeral: EphemeralMessage {
                connection_info: state.ephemeral.conn_info.clone(),
            },
            meta: state.meta.clone(),
        }
    }
}

impl From<InstanceStateMessage> for InstanceState {
    fn from(msg: InstanceStateMessage) -> Self {
        Self {
            id: msg.id,
            attributes: msg.attributes,
            ephemeral: EphemeralState {
                conn_info: msg.ephemeral.connection_info,
            },
            meta: msg.meta,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffMessageAttrType {
    #[default]
    Unknown,
    Input,
    Output,
}

impl DiffMessageAttrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffMessageAttrType::Unknown => "unknown",
            DiffMessageAttrType::Input => "input",
            DiffMessageAttrType::Output => "output",
        }
    }
}

impl From<DiffAttrType> for DiffMessageAttrType {
    fn from(t: DiffAttrType) -> Self {
        match t {
            DiffAttrType::Unknown => DiffMessageAttrType::Unknown,
            DiffAttrType::Input => DiffMessageAttrType::Input,
            DiffAttrType::Output => DiffMessageAttrType::Output,
        }
    }
}

impl From<DiffMessageAttrType> for DiffAttrType {
    fn from(t: DiffMessageAttrType) -> Self {
        match t {
            DiffMessageAttrType::Unknown => DiffAttrType::Unknown,
            DiffMessageAttrType::Input => DiffAttrType::Input,
            DiffMessageAttrType::Output => DiffAttrType::Output,
        }
    }
}

impl Serialize for DiffMessageAttrType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DiffMessageAttrType {
    /// Anything unrecognised, including non-strings, decodes as `Unknown`
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value.as_str() {
            Some("input") => DiffMessageAttrType::Input,
            Some("output") => DiffMessageAttrType::Output,
            _ => DiffMessageAttrType::Unknown,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffMessageAttr {
    pub old_value: String,
    pub new_value: String,
    pub new_is_computed: bool,
    pub new_is_removed: bool,
    /// `null` when absent
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub new_extra: serde_json::Value,
    pub requires_new: bool,
    #[serde(rename = "type")]
    pub attr_type: DiffMessageAttrType,
}

impl From<&ResourceAttrDiff> for DiffMessageAttr {
    fn from(diff: &ResourceAttrDiff) -> Self {
        Self {
            old_value: diff.old.clone(),
            new_value: diff.new.clone(),
            new_is_computed: diff.new_computed,
            new_is_removed: diff.new_removed,
            new_extra: diff.new_extra.clone(),
            requires_new: diff.requires_new,
            attr_type: diff.attr_type.into(),
        }
    }
}

impl From<DiffMessageAttr> for ResourceAttrDiff {
    fn from(msg: DiffMessageAttr) -> Self {
        Self {
            old: msg.old_value,
            new: msg.new_value,
            new_computed: msg.new_is_computed,
            new_removed: msg.new_is_removed,
            new_extra: msg.new_extra,
            requires_new: msg.requires_new,
            attr_type: msg.attr_type.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffMessage {
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: HashMap<String, DiffMessageAttr>,
    pub destroy: bool,
    pub destroy_tainted: bool,
}

impl From<&InstanceDiff> for DiffMessage {
    fn from(diff: &InstanceDiff) -> Self {
        Self {
            attributes: diff
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), DiffMessageAttr::from(v)))
                .collect(),
            destroy: diff.destroy,
            destroy_tainted: diff.destroy_tainted,
        }
    }
}

impl From<DiffMessage> for InstanceDiff {
    fn from(msg: DiffMessage) -> Self {
        Self {
            attributes: msg
                .attributes
                .into_iter()
                .map(|(k, v)| (k, ResourceAttrDiff::from(v)))
                .collect(),
            destroy: msg.destroy,
            destroy_tainted: msg.destroy_tainted,
        }
    }
}

/// Raw configuration map as sent by clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMessage(pub HashMap<String, Dynamic>);

impl ConfigMessage {
    pub fn resource_config(&self) -> Result<ResourceConfig> {
        let raw = RawConfig::new(self.0.clone())?;
        ResourceConfig::new(&raw)
    }

    /// Resolve the config and have `provider` validate it; fails with the
    /// first validation error
    pub async fn valid_resource_config(
        &self,
        ctx: Context,
        provider: &dyn ResourceProvider,
        resource_type: &str,
    ) -> Result<ResourceConfig> {
        let config = self.resource_config()?;
        let diags = ctx
            .guard(async {
                Ok(provider
                    .validate_resource(ctx.clone(), resource_type, &config)
                    .await)
            })
            .await?;

        match diags.errors.first() {
            Some(first) => Err(EngineError::InvalidConfiguration(first.message())),
            None => Ok(config),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfoMessage {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderInfoMessage {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceInfoMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_sources: Vec<ResourceInfoMessage>,
}

impl ProviderInfoMessage {
    pub fn new(provider: &dyn ResourceProvider) -> Self {
        let mut resources: Vec<ResourceInfoMessage> = provider
            .resources()
            .into_iter()
            .map(|r| ResourceInfoMessage { name: r.name })
            .collect();
        resources.sort_by(|a, b| a.name.cmp(&b.name));

        let mut data_sources: Vec<ResourceInfoMessage> = provider
            .data_sources()
            .into_iter()
            .map(|d| ResourceInfoMessage { name: d.name })
            .collect();
        data_sources.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            resources,
            data_sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_diff() -> InstanceDiff {
        InstanceDiff::destroy_tainted()
            .with_attribute(
                "name",
                ResourceAttrDiff::change("old", "new")
                    .requires_new()
                    .with_type(DiffAttrType::Input),
            )
            .with_attribute(
                "arn",
                ResourceAttrDiff::computed("")
                    .with_extra(json!({"hint": [1, 2, {"x": null}]}))
                    .with_type(DiffAttrType::Output),
            )
            .with_attribute("legacy", ResourceAttrDiff::removed("x"))
            .with_attribute(
                "opaque",
                ResourceAttrDiff::change("x", "y").with_extra(serde_json::Value::Null),
            )
    }

    #[test]
    fn diff_survives_wire_round_trip() {
        for diff in [InstanceDiff::new(), InstanceDiff::destroy(), full_diff()] {
            let json = serde_json::to_string(&DiffMessage::from(&diff)).unwrap();
            let back: DiffMessage = serde_json::from_str(&json).unwrap();
            assert_eq!(InstanceDiff::from(back), diff);
        }
    }

    #[test]
    fn attr_wire_field_names() {
        let msg = DiffMessageAttr::from(&ResourceAttrDiff::change("a", "b").requires_new());
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "oldValue": "a",
                "newValue": "b",
                "newIsComputed": false,
                "newIsRemoved": false,
                "requiresNew": true,
                "type": "unknown"
            })
        );
    }

    #[test]
    fn unrecognised_attr_type_decodes_as_unknown() {
        let attr: DiffMessageAttr =
            serde_json::from_value(json!({"oldValue": "a", "type": "sideways"})).unwrap();
        assert_eq!(attr.attr_type, DiffMessageAttrType::Unknown);

        let attr: DiffMessageAttr = serde_json::from_value(json!({"type": 7})).unwrap();
        assert_eq!(attr.attr_type, DiffMessageAttrType::Unknown);

        let attr: DiffMessageAttr = serde_json::from_value(json!({"type": "output"})).unwrap();
        assert_eq!(attr.attr_type, DiffMessageAttrType::Output);
    }

    #[test]
    fn state_round_trip_keeps_ephemeral() {
        let mut state = InstanceState::new("i-1").with_attribute("name", "web");
        state
            .ephemeral
            .conn_info
            .insert("host".to_string(), "10.0.0.1".to_string());
        state.meta.insert("schema_version".to_string(), "1".to_string());

        let json = serde_json::to_value(InstanceStateMessage::from(&state)).unwrap();
        assert_eq!(json["ephemeral"]["connectionInfo"]["host"], "10.0.0.1");

        let back: InstanceStateMessage = serde_json::from_value(json).unwrap();
        assert_eq!(InstanceState::from(back), state);
    }

    #[test]
    fn instance_info_uses_resource_name_key() {
        let msg: InstanceInfoMessage = serde_json::from_value(json!({
            "id": "i-1",
            "modulePath": ["root"],
            "resourceName": "aws_instance"
        }))
        .unwrap();

        let info = InstanceInfo::from(msg);
        assert_eq!(info.resource_type, "aws_instance");
        assert_eq!(info.module_path, vec!["root"]);
    }

    #[test]
    fn config_message_marks_references_computed() {
        let msg: ConfigMessage =
            serde_json::from_value(json!({"name": "web", "subnet": "${aws_subnet.a.id}"})).unwrap();
        let config = msg.resource_config().unwrap();

        assert_eq!(config.computed_keys, vec!["subnet"]);
        assert_eq!(config.get("name"), Some(Dynamic::from("web")));
    }

    #[test]
    fn null_collections_decode_as_empty() {
        let state: InstanceStateMessage = serde_json::from_value(json!({
            "id": "i-1",
            "attributes": null,
            "ephemeral": {"connectionInfo": null},
            "meta": null
        }))
        .unwrap();
        assert_eq!(state.id, "i-1");
        assert!(state.attributes.is_empty());
        assert!(state.ephemeral.connection_info.is_empty());
        assert!(state.meta.is_empty());

        let info: InstanceInfoMessage = serde_json::from_value(json!({
            "id": "i-1",
            "modulePath": null,
            "resourceName": "aws_instance"
        }))
        .unwrap();
        assert!(info.module_path.is_empty());

        let diff: DiffMessage =
            serde_json::from_value(json!({"attributes": null, "destroy": true})).unwrap();
        assert!(diff.attributes.is_empty());
        assert!(diff.destroy);
    }

    #[test]
    fn null_extra_reads_as_absent() {
        let attr: DiffMessageAttr =
            serde_json::from_value(json!({"oldValue": "a", "newValue": "b", "newExtra": null})).unwrap();
        assert!(attr.new_extra.is_null());
        assert!(serde_json::to_value(&attr)
            .unwrap()
            .get("newExtra")
            .is_none());
    }
}
