//! Configuration trees, `${...}` interpolation and merging

mod funcs;
mod raw_config;
mod resource_config;
pub(crate) mod template;
mod variable;

pub use raw_config::{merge_raw_configs, Interpolation, RawConfig};
pub use resource_config::ResourceConfig;
pub use variable::{InterpolatedVariable, ResourceMode, VariableKind};
