//! HTTP endpoints: `GET /` plus `POST /{provider}/{validate,diff,refresh,apply}`

use super::messages::{DiffMessage, InstanceStateMessage, ProviderInfoMessage};
use super::protocol::{
    ApiError, ApplyRequest, ApplyResponse, DiffRequest, DiffResponse, IndexResponse,
    RefreshRequest, RefreshResponse, Reply, ValidateRequest, ValidateResponse,
};
use crate::context::Context;
use crate::diff::InstanceDiff;
use crate::error::EngineError;
use crate::provider::{ProviderMap, ResourceProvider};
use crate::server::ServerConfig;
use crate::types::{InstanceInfo, InstanceState};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One registered provider and the operations served for it
pub struct ProviderApi {
    name: String,
    provider: Arc<dyn ResourceProvider>,
    timeout: Option<Duration>,
}

impl ProviderApi {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn ResourceProvider>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            timeout,
        }
    }

    fn context(&self) -> Context {
        match self.timeout {
            Some(timeout) => Context::new().with_timeout(timeout),
            None => Context::new(),
        }
    }

    pub async fn validate(&self, request: ValidateRequest) -> Reply<ValidateResponse> {
        let failed = |err: EngineError| {
            Reply::new(
                client_or_execution_status(&err),
                ValidateResponse {
                    warnings: Vec::new(),
                    errors: vec![err.to_string()],
                },
            )
        };

        let config = match request.config.resource_config() {
            Ok(config) => config,
            Err(err) => return failed(err),
        };

        debug!(
            "Validating config for {} resource {}",
            self.name, request.resource_name
        );
        let ctx = self.context();
        let diags = match ctx
            .guard(async {
                Ok(self
                    .provider
                    .validate_resource(ctx.clone(), &request.resource_name, &config)
                    .await)
            })
            .await
        {
            Ok(diags) => diags,
            Err(err) => return failed(err),
        };

        let status = if diags.has_errors() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        };
        Reply::new(
            status,
            ValidateResponse {
                warnings: diags.warning_messages(),
                errors: diags.error_messages(),
            },
        )
    }

    pub async fn diff(&self, request: DiffRequest) -> Reply<DiffResponse> {
        let info = InstanceInfo::from(request.instance_info);
        let state = InstanceState::from(request.current_state);
        let ctx = self.context();

        // Diff implementations are not robust against invalid config
        let config = match request
            .new_config
            .valid_resource_config(ctx.clone(), self.provider.as_ref(), &info.resource_type)
            .await
        {
            Ok(config) => config,
            Err(err) => {
                let status = client_or_execution_status(&err);
                return Reply::new(status, DiffResponse::failed(err));
            }
        };

        debug!("Diffing {} resource {}", self.name, info.resource_type);
        let result = ctx
            .guard(self.provider.diff(ctx.clone(), &info, &state, &config))
            .await;

        match result {
            Ok(diff) => {
                debug!("Diff for {} resource {}: {:?}", self.name, info.resource_type, diff);
                Reply::ok(DiffResponse {
                    diff: diff.as_ref().map(DiffMessage::from),
                    error: None,
                })
            }
            Err(err) => {
                self.log_failure("diff", &info, &err);
                Reply::new(execution_status(&err), DiffResponse::failed(err))
            }
        }
    }

    pub async fn refresh(&self, request: RefreshRequest) -> Reply<RefreshResponse> {
        let info = InstanceInfo::from(request.instance_info);
        let state = InstanceState::from(request.current_state);
        let ctx = self.context();

        debug!("Refreshing {} resource {}", self.name, info.resource_type);
        let result = ctx
            .guard(self.provider.refresh(ctx.clone(), &info, &state))
            .await;

        self.state_reply("refresh", &info, result)
    }

    pub async fn apply(&self, request: ApplyRequest) -> Reply<ApplyResponse> {
        let info = InstanceInfo::from(request.instance_info);
        let state = InstanceState::from(request.current_state);
        let diff = InstanceDiff::from(request.diff);

        if let Err(err) = diff.check_consistency() {
            return Reply::new(StatusCode::BAD_REQUEST, ApplyResponse::failed(err));
        }

        let ctx = self.context();
        debug!("Applying {} resource {}", self.name, info.resource_type);
        let result = ctx
            .guard(self.provider.apply(ctx.clone(), &info, &state, &diff))
            .await;

        self.state_reply("apply", &info, result)
    }

    fn state_reply(
        &self,
        operation: &str,
        info: &InstanceInfo,
        result: crate::error::Result<Option<InstanceState>>,
    ) -> Reply<RefreshResponse> {
        match result {
            Ok(new_state) => Reply::ok(RefreshResponse {
                new_state: new_state.as_ref().map(InstanceStateMessage::from),
                error: None,
            }),
            Err(err) => {
                self.log_failure(operation, info, &err);
                Reply::new(execution_status(&err), RefreshResponse::failed(err))
            }
        }
    }

    fn log_failure(&self, operation: &str, info: &InstanceInfo, err: &EngineError) {
        if err.is_timeout() {
            warn!(
                "{} of {} resource {} did not finish: {}",
                operation,
                self.name,
                info.human_id(),
                err
            );
        } else {
            debug!(
                "{} of {} resource {} failed: {}",
                operation,
                self.name,
                info.human_id(),
                err
            );
        }
    }
}

impl DiffResponse {
    fn failed(err: EngineError) -> Self {
        Self {
            diff: None,
            error: Some(err.to_string()),
        }
    }
}

impl RefreshResponse {
    fn failed(err: EngineError) -> Self {
        Self {
            new_state: None,
            error: Some(err.to_string()),
        }
    }
}

/// Status for failures while the provider runs
fn execution_status(err: &EngineError) -> StatusCode {
    if err.is_timeout() {
        StatusCode::GATEWAY_TIMEOUT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Status for failures while preparing or validating the request
fn client_or_execution_status(err: &EngineError) -> StatusCode {
    match err {
        EngineError::TemplateParse { .. }
        | EngineError::Interpolation(_)
        | EngineError::InvalidConfiguration(_)
        | EngineError::InconsistentDiff(_)
        | EngineError::DecodingError(_) => StatusCode::BAD_REQUEST,
        other => execution_status(other),
    }
}

#[derive(Clone)]
struct ApiState {
    providers: Arc<HashMap<String, ProviderApi>>,
}

impl ApiState {
    fn provider(&self, name: &str) -> Result<&ProviderApi, ApiError> {
        self.providers.get(name).ok_or_else(|| {
            ApiError::not_found(EngineError::ProviderNotFound(name.to_string()).to_string())
        })
    }
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))
}

/// Build the router serving every provider in `providers`
pub fn router(providers: ProviderMap, config: &ServerConfig) -> Router {
    let providers = providers
        .into_iter()
        .map(|(name, provider)| {
            let api = ProviderApi::new(name.clone(), provider, config.operation_timeout);
            (name, api)
        })
        .collect();

    Router::new()
        .route("/", get(index))
        .route("/{provider}/validate", post(validate))
        .route("/{provider}/diff", post(diff))
        .route("/{provider}/refresh", post(refresh))
        .route("/{provider}/apply", post(apply))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .with_state(ApiState {
            providers: Arc::new(providers),
        })
}

async fn index(State(state): State<ApiState>) -> Response {
    let providers = state
        .providers
        .iter()
        .map(|(name, api)| (name.clone(), ProviderInfoMessage::new(api.provider.as_ref())))
        .collect();

    Reply::ok(IndexResponse { providers }).into_response()
}

async fn validate(
    State(state): State<ApiState>,
    Path(provider): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let api = state.provider(&provider)?;
    let request: ValidateRequest = decode(&body)?;
    Ok(api.validate(request).await.into_response())
}

async fn diff(
    State(state): State<ApiState>,
    Path(provider): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let api = state.provider(&provider)?;
    let request: DiffRequest = decode(&body)?;
    Ok(api.diff(request).await.into_response())
}

async fn refresh(
    State(state): State<ApiState>,
    Path(provider): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let api = state.provider(&provider)?;
    let request: RefreshRequest = decode(&body)?;
    Ok(api.refresh(request).await.into_response())
}

async fn apply(
    State(state): State<ApiState>,
    Path(provider): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let api = state.provider(&provider)?;
    let request: ApplyRequest = decode(&body)?;
    Ok(api.apply(request).await.into_response())
}
