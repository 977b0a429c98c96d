use loom_ir::helpers::replace_var_with_expr;
use loom_ir::visit::{walk_expr_mut, walk_poly_for_mut};
use loom_ir::{Expr, ForKind, LaunchDims, LoweredFunc, Mutator, PolyFor};
use snafu::OptionExt;
use tracing::debug;

use crate::error::*;

/// Splice bound loops into their parent and record their extents.
struct RemoveGpuForloops<'a> {
    function: &'a str,
    dims: LaunchDims,
}

impl Mutator for RemoveGpuForloops<'_> {
    type Error = Error;

    fn mutate_expr(&mut self, expr: &mut Expr) -> Result<()> {
        let Expr::For(for_loop) = expr else {
            return walk_expr_mut(self, expr);
        };
        let ForKind::Bound(axis) = for_loop.kind else {
            return walk_expr_mut(self, expr);
        };

        let Some(extent) = for_loop.extent.as_const_int() else {
            return NonConstantAxisExtentSnafu { function: self.function, axis, extent: (*for_loop.extent).clone() }
                .fail();
        };
        self.dims.set(axis, extent);

        // The hardware index runs from zero; the iterator ran from `min`.
        let replacement = if for_loop.min.is_zero() { axis.expr() } else { axis.expr() + (*for_loop.min).clone() };
        let mut body = std::mem::take(&mut for_loop.body);
        if replacement.as_var().is_none_or(|v| v.name != for_loop.loop_var.name) {
            replace_var_with_expr(&mut body, &for_loop.loop_var.name, &replacement);
        }

        *expr = *body;
        self.mutate_expr(expr)
    }

    fn mutate_poly_for(&mut self, poly_for: &mut PolyFor) -> Result<()> {
        if poly_for.kind.is_bound() {
            return BoundPolyForSnafu { function: self.function, iterator: &poly_for.iterator.name }.fail();
        }
        walk_poly_for_mut(self, poly_for)
    }
}

fn remove_in_function(func: &mut LoweredFunc) -> Result<()> {
    let mut remover = RemoveGpuForloops { function: &func.name, dims: LaunchDims::new() };
    remover.mutate_expr(&mut func.body)?;
    let dims = remover.dims;
    func.launch.merge(&dims);
    debug!(function = %func.name, launch = %func.launch, "removed device-axis loops");
    Ok(())
}

/// Remove the loops bound to device axes from a lowered function or from
/// every function of a module.
///
/// Each bound loop is replaced by its body with the iterator rewritten to the
/// axis symbol (plus the loop minimum, when non-zero). The extents of removed
/// loops are merged into the function's launch dimensions.
#[tracing::instrument(skip_all, fields(kind = expr.kind_name()))]
pub fn remove_gpu_forloops_axis(expr: &mut Expr) -> Result<()> {
    match expr {
        Expr::LoweredFunc(func) => remove_in_function(func),
        Expr::Module(module) => {
            for func in &mut module.functions {
                let kind = func.kind_name();
                let func = func.as_lowered_func_mut().context(NotALoweredFuncSnafu { kind })?;
                remove_in_function(func)?;
            }
            Ok(())
        }
        other => NotALoweredFuncSnafu { kind: other.kind_name() }.fail(),
    }
}
