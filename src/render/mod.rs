//! Synthetic source data for local runs and tests.

pub mod sample_data;

pub use sample_data::{render, write_sources, SampleData, SampleDataConfig, SourcePaths};
