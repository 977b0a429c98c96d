//! Single-tensor inline expansion.

use std::collections::HashMap;

use loom_ir::helpers::substitute_vars;
use loom_ir::types::{BLOCK_IDX_PREFIX, THREAD_IDX_PREFIX, WRITE_CACHE_SUFFIX, is_temp_buffer_name};
use loom_ir::visit::{walk_expr_mut, walk_load_mut};
use loom_ir::{Expr, Load, MemoryScope, Mutator};
use snafu::OptionExt;

use crate::context::LoweringContext;
use crate::error::*;

/// Replaces every load of one tensor with its expansion.
///
/// Three flags track where the traversal is:
/// - `inline_code`: inside an expansion body
/// - `temp_buffer`: inside the indices of a cache or scratch buffer access
/// - `memory_local`: that buffer is thread-private
///
/// Each flag is restored on leaving the scope that set it.
pub(crate) struct TensorInlineExpandMutator<'a> {
    tensor_name: &'a str,
    ctx: &'a LoweringContext,
    inline_code: bool,
    temp_buffer: bool,
    memory_local: bool,
    pub(crate) expanded: usize,
}

impl<'a> TensorInlineExpandMutator<'a> {
    pub(crate) fn new(tensor_name: &'a str, ctx: &'a LoweringContext) -> Self {
        Self { tensor_name, ctx, inline_code: false, temp_buffer: false, memory_local: false, expanded: 0 }
    }

    /// Block indices are uniform across a scratch buffer; thread indices only
    /// for thread-private ones.
    fn erases_var(&self, name: &str) -> bool {
        self.inline_code
            && self.temp_buffer
            && (name.starts_with(BLOCK_IDX_PREFIX) || (self.memory_local && name.starts_with(THREAD_IDX_PREFIX)))
    }

    /// Non-cache counterpart of a heap write-cache tensor handle.
    fn heap_cache_alias(&self, name: &str) -> Result<Option<String>> {
        let Some(base) = name.strip_suffix(WRITE_CACHE_SUFFIX) else {
            return Ok(None);
        };
        self.ctx.tensors.tensor(name)?;
        if self.ctx.tensors.scope_of(name) != Some(MemoryScope::Heap) {
            return Ok(None);
        }
        if !self.ctx.tensors.contains_tensor(base) {
            return UnknownTensorSnafu { name: base }.fail();
        }
        Ok(Some(base.to_string()))
    }

    /// Zero the indices bound by the enclosing compute-at loops of `tensor`.
    fn erase_compute_at_indices(&self, tensor: &str, indices: &mut [Expr]) -> Result<()> {
        let stage = self.ctx.stage(tensor)?;
        let Some(compute_at) = stage.single_compute_at()? else {
            return Ok(());
        };
        let names = stage.axis_names.get(..=compute_at.level).context(ComputeAtLevelOutOfRangeSnafu {
            tensor,
            level: compute_at.level,
            axes: stage.axis_names.len(),
        })?;

        let zero = Expr::zero();
        let bindings: HashMap<&str, &Expr> = names.iter().map(|name| (name.as_str(), &zero)).collect();
        for index in indices.iter_mut() {
            substitute_vars(index, &bindings);
        }
        tracing::trace!(tensor, level = compute_at.level, "erased compute-at indices");
        Ok(())
    }
}

impl Mutator for TensorInlineExpandMutator<'_> {
    type Error = Error;

    fn mutate_expr(&mut self, expr: &mut Expr) -> Result<()> {
        if let Expr::Var(var) = expr
            && self.erases_var(&var.name)
        {
            *expr = Expr::zero();
            return Ok(());
        }

        if self.inline_code
            && let Expr::Tensor(tensor) = expr
            && let Some(alias) = self.heap_cache_alias(&tensor.name)?
        {
            *expr = Expr::tensor_ref(alias);
            return Ok(());
        }

        if let Expr::Load(load) = expr
            && load.tensor_name() == Some(self.tensor_name)
        {
            let expansion = self.ctx.tensors.tensor(self.tensor_name)?.inline_expanded(&load.indices)?;
            *expr = expansion;
            self.expanded += 1;

            let keep_inline = std::mem::replace(&mut self.inline_code, true);
            let result = self.mutate_expr(expr);
            self.inline_code = keep_inline;
            return result;
        }

        walk_expr_mut(self, expr)
    }

    /// Loads of every tensor other than the one being expanded.
    fn mutate_load(&mut self, load: &mut Load) -> Result<()> {
        if !self.inline_code {
            return walk_load_mut(self, load);
        }
        let Some(tensor) = load.tensor_name().map(str::to_string) else {
            return walk_load_mut(self, load);
        };
        let Some(buffer) = self.ctx.tensors.tensor_buffer(&tensor) else {
            return walk_load_mut(self, load);
        };
        let (buffer_name, scope) = (buffer.name.as_str(), buffer.scope);

        if scope == MemoryScope::Heap
            && let Some(stripped) = buffer_name.strip_suffix(WRITE_CACHE_SUFFIX)
        {
            let alias = stripped.strip_prefix('_').unwrap_or(stripped);
            if self.ctx.tensors.contains_tensor(alias) {
                return walk_load_mut(self, load);
            }
            return self.erase_compute_at_indices(&tensor, &mut load.indices);
        }

        if is_temp_buffer_name(buffer_name) {
            self.erase_compute_at_indices(&tensor, &mut load.indices)?;

            let keep_temp = std::mem::replace(&mut self.temp_buffer, true);
            let keep_local = self.memory_local;
            self.memory_local |= scope == MemoryScope::GpuLocal;
            let result = walk_load_mut(self, load);
            self.temp_buffer = keep_temp;
            self.memory_local = keep_local;
            return result;
        }

        walk_load_mut(self, load)
    }
}
