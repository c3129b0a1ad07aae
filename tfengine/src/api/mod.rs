//! JSON-over-HTTP wire protocol for providers

mod endpoints;
pub mod messages;
pub mod protocol;

pub use endpoints::{router, ProviderApi};
pub use messages::{
    ConfigMessage, DiffMessage, DiffMessageAttr, DiffMessageAttrType, EphemeralMessage,
    InstanceInfoMessage, InstanceStateMessage, ProviderInfoMessage, ResourceInfoMessage,
};
pub use protocol::{
    ApiError, ApplyRequest, ApplyResponse, DiffRequest, DiffResponse, ErrorResponse,
    IndexResponse, RefreshRequest, RefreshResponse, Reply, StateResponse, ValidateRequest,
    ValidateResponse,
};
