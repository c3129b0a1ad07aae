pub mod null_resource;

pub use null_resource::NullResource;
