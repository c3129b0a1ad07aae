//! Request and response bodies of the provider endpoints
//!
//! Every operation response has the same convention: a populated `error`
//! (or `errors`) field means the call failed, regardless of status code.

use super::messages::{
    null_as_default, ConfigMessage, DiffMessage, InstanceInfoMessage, InstanceStateMessage,
    ProviderInfoMessage,
};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateRequest {
    pub resource_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub config: ConfigMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateResponse {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub instance_info: InstanceInfoMessage,
    #[serde(deserialize_with = "null_as_default")]
    pub current_state: InstanceStateMessage,
    #[serde(deserialize_with = "null_as_default")]
    pub new_config: ConfigMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub instance_info: InstanceInfoMessage,
    #[serde(deserialize_with = "null_as_default")]
    pub current_state: InstanceStateMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub instance_info: InstanceInfoMessage,
    #[serde(deserialize_with = "null_as_default")]
    pub current_state: InstanceStateMessage,
    #[serde(deserialize_with = "null_as_default")]
    pub diff: DiffMessage,
}

/// Body of Refresh and Apply responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_state: Option<InstanceStateMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type RefreshResponse = StateResponse;
pub type ApplyResponse = StateResponse;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexResponse {
    pub providers: BTreeMap<String, ProviderInfoMessage>,
}

/// Body for failures that happen before an operation runs: unreadable or
/// malformed request bodies and unknown providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A response body together with its status code
#[derive(Debug)]
pub struct Reply<T> {
    pub status: StatusCode,
    pub body: T,
}

impl<T> Reply<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn new(status: StatusCode, body: T) -> Self {
        Self { status, body }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Rejection returned by the endpoint handlers
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Reply::new(
            self.status,
            ErrorResponse {
                error: self.message,
            },
        )
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_fields_are_omitted() {
        assert_eq!(
            serde_json::to_value(DiffResponse::default()).unwrap(),
            json!({})
        );
        assert_eq!(
            serde_json::to_value(ValidateResponse {
                warnings: vec!["w".to_string()],
                errors: vec![],
            })
            .unwrap(),
            json!({"warnings": ["w"]})
        );
    }

    #[test]
    fn diff_request_tolerates_missing_sections() {
        let req: DiffRequest = serde_json::from_value(json!({
            "instanceInfo": {"resourceName": "aws_instance"},
            "newConfig": {"name": "web"}
        }))
        .unwrap();

        assert_eq!(req.instance_info.resource_name, "aws_instance");
        assert!(req.current_state.attributes.is_empty());
        assert_eq!(req.new_config.0.len(), 1);
    }
}
