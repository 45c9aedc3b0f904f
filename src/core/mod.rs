//! Core data structures shared by every stage of the pipeline.
//!
//! Sources produce [`Table`]s of loosely typed [`Value`]s, the transform stage
//! reshapes them, and loaders persist them.

pub mod table;
pub mod value;

pub use table::{Record, Table};
pub use value::Value;
