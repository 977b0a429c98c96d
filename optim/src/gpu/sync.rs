use std::convert::Infallible;

use loom_ir::visit::{walk_expr_mut, walk_store};
use loom_ir::{Expr, IfThenElse, MemoryScope, Mutator, Store, Visitor};
use tracing::debug;

use crate::context::LoweringContext;

/// True if some store in the visited tree writes GPU shared memory.
struct WritesShared<'a> {
    ctx: &'a LoweringContext,
}

impl WritesShared<'_> {
    fn is_shared(&self, store: &Store) -> bool {
        if let Some(tensor) = store.tensor_name() {
            return self.ctx.tensor_scope(tensor) == Some(MemoryScope::GpuShared);
        }
        store
            .target_name()
            .and_then(|buffer| self.ctx.tensors.buffer(buffer).ok())
            .is_some_and(|buffer| buffer.scope == MemoryScope::GpuShared)
    }
}

impl Visitor for WritesShared<'_> {
    type Output = bool;

    fn visit_store(&mut self, store: &Store) -> bool {
        self.is_shared(store) || walk_store(self, store)
    }
}

struct InsertSyncThreads<'a> {
    ctx: &'a LoweringContext,
    inserted: usize,
}

impl InsertSyncThreads<'_> {
    /// A conditional with a shared-memory write in either branch.
    fn is_divergent_shared_write(&self, expr: &Expr) -> bool {
        let Expr::IfThenElse(IfThenElse { true_case, false_case, .. }) = expr else {
            return false;
        };
        let mut writes = WritesShared { ctx: self.ctx };
        writes.visit_expr(true_case) || false_case.as_deref().is_some_and(|f| writes.visit_expr(f))
    }
}

impl Mutator for InsertSyncThreads<'_> {
    type Error = Infallible;

    fn mutate_expr(&mut self, expr: &mut Expr) -> Result<(), Infallible> {
        // Conditionals directly inside a block are handled by `mutate_block`.
        if self.is_divergent_shared_write(expr) {
            let stmt = std::mem::take(expr);
            *expr = Expr::block(vec![Expr::sync_threads(), stmt]);
            self.inserted += 1;
            return Ok(());
        }
        walk_expr_mut(self, expr)
    }

    fn mutate_block(&mut self, stmts: &mut Vec<Expr>) -> Result<(), Infallible> {
        let mut out = Vec::with_capacity(stmts.len());
        for mut stmt in stmts.drain(..) {
            if self.is_divergent_shared_write(&stmt) {
                if !out.last().is_some_and(Expr::is_sync_threads) {
                    out.push(Expr::sync_threads());
                    self.inserted += 1;
                }
                out.push(stmt);
                continue;
            }
            self.mutate_expr(&mut stmt)?;
            out.push(stmt);
        }
        *stmts = out;
        Ok(())
    }
}

/// Insert a `__syncthreads()` barrier before every outermost conditional
/// whose branches write GPU shared memory.
///
/// A tensor's scope is its buffer's scope, else its stage's scope.
/// Nested conditionals are covered by the barrier of the outermost one. A
/// barrier already directly in front is reused, so the pass is idempotent.
/// Returns the number of barriers inserted.
#[tracing::instrument(skip_all)]
pub fn insert_sync_threads(ctx: &LoweringContext, expr: &mut Expr) -> usize {
    let mut pass = InsertSyncThreads { ctx, inserted: 0 };
    match pass.mutate_expr(expr) {
        Ok(()) => {}
        Err(never) => match never {},
    }
    debug!(inserted = pass.inserted, "inserted barriers");
    pass.inserted
}
