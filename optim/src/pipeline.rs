//! End-to-end lowering of one function: inline expansion, then device-axis
//! binding.

use loom_ir::helpers::collect_store_tensors;
use loom_ir::{Expr, ForloopInfos, LoweredFunc, StageMap};

use crate::context::LoweringContext;
use crate::error::*;
use crate::gpu::{ResizedBuffers, gather_axis_info, insert_sync_threads, remove_gpu_forloops_axis, transform_gpu_forloops};
use crate::inline::{check_inline_complete, compute_inline_expand};

/// Which loops bind to which device axes, and in what order tensors are visited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingPlan {
    pub forloop_infos: ForloopInfos,
    pub traverse_order: Vec<String>,
}

impl BindingPlan {
    /// Bindings recorded on the stages, visited in stage insertion order.
    pub fn from_stages(stages: &StageMap) -> Self {
        let forloop_infos = stages.forloop_infos();
        let traverse_order = stages.iter().map(|s| s.tensor.clone()).filter(|t| forloop_infos.contains_key(t)).collect();
        Self { forloop_infos, traverse_order }
    }

    pub fn with_traverse_order(mut self, order: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.traverse_order = order.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.forloop_infos.is_empty()
    }
}

/// Lower `func` (a lowered function or a module of them) in place.
///
/// Stages, in order:
/// 1. compute-inline expansion, optionally followed by the completeness check
/// 2. launch extents gathered from the bound stages
/// 3. loop binding and temp buffer resizing
/// 4. removal of bound loops; each function takes the launch extents of the
///    bound tensors it stores to
/// 5. barrier insertion, if enabled
///
/// On failure the tree may be partially rewritten.
#[tracing::instrument(skip_all, fields(ir.initial = %func.tree()))]
pub fn lower_function(ctx: &mut LoweringContext, func: &mut Expr, plan: &BindingPlan) -> Result<()> {
    let result = run_stages(ctx, func, plan);
    if let Err(err) = &result {
        tracing::error!(%err, "lowering failed");
    }
    result
}

fn run_stages(ctx: &mut LoweringContext, func: &mut Expr, plan: &BindingPlan) -> Result<()> {
    compute_inline_expand(ctx, func)?;
    if ctx.config.check_completeness {
        check_inline_complete(ctx, func)?;
    }
    tracing::debug!(ir.lowered = func.tree(), "after compute_inline_expand");

    let bound_stages = plan.forloop_infos.keys().map(|tensor| ctx.stage(tensor)).collect::<Result<Vec<_>>>()?;
    let axis_info = gather_axis_info(bound_stages)?;
    tracing::debug!(launch = %axis_info, "gathered axis info");

    let mut resized = ResizedBuffers::new();
    transform_gpu_forloops(ctx, &plan.forloop_infos, &plan.traverse_order, &axis_info, &mut resized, func)?;
    tracing::debug!(ir.lowered = func.tree(), resized = resized.len(), "after transform_gpu_forloops");

    remove_gpu_forloops_axis(func)?;
    merge_launch(ctx, plan, func)?;
    tracing::debug!(ir.lowered = func.tree(), "after remove_gpu_forloops_axis");

    if ctx.config.insert_sync_threads {
        insert_sync_threads(ctx, func);
        tracing::debug!(ir.lowered = func.tree(), "after insert_sync_threads");
    }
    Ok(())
}

fn merge_launch(ctx: &LoweringContext, plan: &BindingPlan, func: &mut Expr) -> Result<()> {
    match func {
        Expr::LoweredFunc(f) => merge_function_launch(ctx, plan, f),
        Expr::Module(m) => {
            for f in m.functions.iter_mut().filter_map(Expr::as_lowered_func_mut) {
                merge_function_launch(ctx, plan, f)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Merge the stage extents of the bound tensors `func` writes.
fn merge_function_launch(ctx: &LoweringContext, plan: &BindingPlan, func: &mut LoweredFunc) -> Result<()> {
    let stored = collect_store_tensors(&func.body);
    let stages = plan
        .forloop_infos
        .keys()
        .filter(|tensor| stored.contains(tensor.as_str()))
        .map(|tensor| ctx.stage(tensor))
        .collect::<Result<Vec<_>>>()?;
    if stages.is_empty() {
        return Ok(());
    }
    let dims = gather_axis_info(stages)?;
    func.launch.merge(&dims);
    tracing::trace!(function = %func.name, launch = %func.launch, "merged stage extents");
    Ok(())
}
