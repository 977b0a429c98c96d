//! Lowering passes for the loom compiler.
//!
//! These passes take a loop-nest tree produced by the scheduler and prepare
//! it for GPU code generation.
//!
//! # Module Organization
//!
//! - [`inline`] - Compute-inline expansion of tensors marked inlined
//! - [`dependency`] - Tensor dependency graph used to order expansion
//! - [`gpu`] - Device-axis binding: launch dimensions, buffer resizing, barriers
//! - [`pipeline`] - The passes chained over one function
//! - [`context`] - Tensor/stage arenas and configuration shared by the passes
//! - [`config`] - Lowering configuration with builder and environment fallbacks
//! - [`error`] - Error types and result handling

pub mod config;
pub mod context;
pub mod dependency;
pub mod error;
pub mod gpu;
pub mod inline;
pub mod pipeline;


pub use config::LowerConfig;
pub use context::LoweringContext;
pub use dependency::DependencyGraph;
pub use error::{Error, Result};
pub use gpu::{
    ResizedBuffers, gather_axis_info, insert_sync_threads, remove_gpu_forloops_axis, resized_shape,
    transform_gpu_forloops,
};
pub use inline::{check_inline_complete, compute_inline_expand};
pub use pipeline::{BindingPlan, lower_function};
