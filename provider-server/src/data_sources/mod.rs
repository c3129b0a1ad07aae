pub mod null_data_source;

pub use null_data_source::NullDataSource;
