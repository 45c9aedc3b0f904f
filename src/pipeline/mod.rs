//! Phase orchestration: extract, transform, load.

pub mod etl_pipeline;
pub mod summary;

pub use etl_pipeline::{transform, EtlPipeline, StarSchema, TransformOptions};
pub use summary::{write_rejections, RunSummary};
