//! Recursive object-graph merging.

pub mod engine;

pub use engine::MergeEngine;
