//! Compute-inline expansion.
//!
//! A tensor whose stage is marked inlined is never materialized: each load
//! `T[idx...]` is replaced by T's compute body with its axes bound to `idx`.
//! Expansion can expose loads of further inlined tensors, so the driver
//! orders the work on the inline dependency graph and rescans until the tree
//! is free of inlined loads.

mod mutator;

use loom_ir::helpers::{collect_load_tensors, collect_tensor_names};
use loom_ir::{Expr, Mutator};
use snafu::ensure;
use tracing::{debug, trace};

use crate::context::LoweringContext;
use crate::dependency::DependencyGraph;
use crate::error::*;

pub(crate) use mutator::TensorInlineExpandMutator;

/// Expand every inlined tensor referenced in `expr`.
///
/// Tensors are expanded dependents first, so one round usually suffices;
/// further rounds pick up loads exposed by earlier expansions. Fails with
/// [`Error::InlineDidNotConverge`] after `max_inline_rounds` rounds.
#[tracing::instrument(skip_all, fields(max_rounds = ctx.config.max_inline_rounds))]
pub fn compute_inline_expand(ctx: &LoweringContext, expr: &mut Expr) -> Result<()> {
    let mut pending: Vec<String> = collect_tensor_names(expr).into_iter().filter(|n| ctx.is_inlined(n)).collect();
    let mut rounds = 0;

    while !pending.is_empty() {
        if rounds == ctx.config.max_inline_rounds {
            return InlineDidNotConvergeSnafu { rounds, remaining: pending }.fail();
        }
        rounds += 1;

        let graph = DependencyGraph::inline_subgraph(pending.iter().map(String::as_str), ctx)?;
        let order = graph.expansion_order()?;
        debug!(round = rounds, ?order, "expanding inline tensors");

        for name in &order {
            let mut mutator = TensorInlineExpandMutator::new(name, ctx);
            mutator.mutate_expr(expr)?;
            trace!(tensor = %name, loads = mutator.expanded, "expanded");
        }

        pending = remaining_inline_loads(ctx, expr);
    }

    debug!(rounds, "inline expansion done");
    Ok(())
}

/// Fail if any load of an inlined tensor survives in `expr`.
pub fn check_inline_complete(ctx: &LoweringContext, expr: &Expr) -> Result<()> {
    let tensors = remaining_inline_loads(ctx, expr);
    ensure!(tensors.is_empty(), IncompleteInlineSnafu { tensors });
    Ok(())
}

fn remaining_inline_loads(ctx: &LoweringContext, expr: &Expr) -> Vec<String> {
    collect_load_tensors(expr, |name| ctx.is_inlined(name)).into_iter().collect()
}
