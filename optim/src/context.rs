//! Per-compilation-unit lowering state.

use loom_ir::{MemoryScope, Stage, StageMap, TensorMap};
use snafu::OptionExt;

use crate::config::LowerConfig;
use crate::error::*;

/// Everything a lowering pass reads besides the tree itself.
///
/// One context exists per compilation unit. Passes take it by reference, so
/// independent units can be lowered on different threads without sharing
/// state.
#[derive(Debug, Clone, Default)]
pub struct LoweringContext {
    pub tensors: TensorMap,
    pub stages: StageMap,
    pub config: LowerConfig,
}

impl LoweringContext {
    pub fn new(tensors: TensorMap, stages: StageMap) -> Self {
        Self { tensors, stages, config: LowerConfig::default() }
    }

    pub fn with_config(mut self, config: LowerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stage(&self, tensor: &str) -> Result<&Stage> {
        self.stages.get(tensor).context(MissingStageSnafu { tensor })
    }

    pub fn is_inlined(&self, tensor: &str) -> bool {
        self.stages.is_inlined(tensor)
    }

    /// Memory scope of `tensor`: its buffer's scope, else its stage's scope.
    pub fn tensor_scope(&self, tensor: &str) -> Option<MemoryScope> {
        self.tensors.scope_of(tensor).or_else(|| self.stages.get(tensor).map(|s| s.scope))
    }
}
