use std::convert::Infallible;

use loom_ir::helpers::{contains_store_to, replace_var_with_expr};
use loom_ir::visit::walk_for_mut;
use loom_ir::{AxisBindings, DeviceAxis, Expr, For, ForKind, ForloopInfos, LaunchDims, Mutator};
use smallvec::SmallVec;
use tracing::debug;

use super::resize::{ResizedBuffers, resize_temp_buffer};
use crate::context::LoweringContext;
use crate::error::*;

/// Tag the loops of one tensor's nest with their device axes.
///
/// A loop is tagged when its iterator is bound for `tensor` and its body
/// stores to `tensor`. The iterator is renamed to the axis symbol, so the
/// body reads `threadIdx.x` instead of `i`.
struct MarkGpuForloops<'a> {
    tensor: &'a str,
    bindings: &'a AxisBindings,
    bound: SmallVec<[DeviceAxis; 6]>,
}

impl Mutator for MarkGpuForloops<'_> {
    type Error = Infallible;

    fn mutate_for(&mut self, for_loop: &mut For) -> Result<(), Infallible> {
        walk_for_mut(self, for_loop)?;

        if for_loop.kind.is_bound() {
            return Ok(());
        }
        let Some(&axis) = self.bindings.get(&for_loop.loop_var.name) else {
            return Ok(());
        };
        if !contains_store_to(&for_loop.body, self.tensor) {
            return Ok(());
        }

        let iterator = std::mem::replace(&mut for_loop.loop_var, axis.var());
        replace_var_with_expr(&mut for_loop.body, &iterator.name, &axis.expr());
        for_loop.kind = ForKind::Bound(axis);
        self.bound.push(axis);
        Ok(())
    }
}

/// Bind the scheduled loops of every tensor in `traverse_order` to device axes.
///
/// Tensors absent from `forloop_infos` are skipped. After a tensor's loops
/// are tagged, its GPU temp buffer (if any) is shrunk to the slice one block
/// or one thread owns, using the extents in `axis_info`. Loops already bound
/// are left alone, so running this twice changes nothing.
#[tracing::instrument(skip_all, fields(tensors = traverse_order.len()))]
pub fn transform_gpu_forloops(
    ctx: &mut LoweringContext,
    forloop_infos: &ForloopInfos,
    traverse_order: &[String],
    axis_info: &LaunchDims,
    resized: &mut ResizedBuffers,
    expr: &mut Expr,
) -> Result<()> {
    for tensor in traverse_order {
        let Some(bindings) = forloop_infos.get(tensor) else {
            continue;
        };
        let mut marker = MarkGpuForloops { tensor, bindings, bound: SmallVec::new() };
        match marker.mutate_expr(expr) {
            Ok(()) => {}
            Err(never) => match never {},
        }
        if marker.bound.is_empty() {
            continue;
        }
        debug!(%tensor, axes = ?marker.bound, "bound loops to device axes");

        resize_temp_buffer(ctx, tensor, axis_info, resized, expr)?;
    }
    Ok(())
}
