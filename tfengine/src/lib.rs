//! tfengine - configuration interpolation, resource diffs and the provider
//! wire protocol
//!
//! Providers implement [`ResourceProvider`]; [`serve`] exposes a set of them
//! over JSON/HTTP with Validate, Diff, Refresh and Apply operations per
//! provider.

// Core modules
pub mod attribute_type;
pub mod context;
pub mod error;
pub mod flatmap;
pub mod schema;
pub mod types;

// Configuration and diffs
pub mod config;
pub mod diff;

// Provider contract and graph evaluation
pub mod eval;
pub mod provider;

// Wire protocol
pub mod api;
pub mod server;

// Re-exports for convenience
pub use attribute_type::AttributeType;
pub use config::{InterpolatedVariable, RawConfig, ResourceConfig, ResourceMode};
pub use context::Context;
pub use diff::{DiffAttrType, DiffChangeType, InstanceDiff, ResourceAttrDiff};
pub use error::{EngineError, Result};
pub use provider::{DataSourceType, ProviderMap, ResourceProvider, ResourceType};
pub use schema::{AttributeBuilder, Block, BlockBuilder, NestedBlock, NestingMode};
pub use server::{serve, serve_with_listener, LogLevel, ServerConfig};
pub use types::{Diagnostics, Dynamic, InstanceInfo, InstanceState, UNKNOWN_VARIABLE_VALUE};
