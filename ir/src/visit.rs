//! Structural traversal over [`Expr`] trees.
//!
//! Two traits share one dispatch shape:
//!
//! - [`Visitor`] inspects a tree read-only and folds a result of type
//!   [`Visitor::Output`] bottom-up through [`Aggregate::merge`].
//! - [`Mutator`] rewrites a tree in place. Its slot-level hook
//!   [`Mutator::mutate_expr`] receives the `&mut Expr` that holds a node and may
//!   overwrite it wholesale; per-kind hooks receive the node payload.
//!
//! Every hook defaults to the matching `walk_*` function, which recurses into
//! the owned children in the fixed order below and does nothing else. An
//! implementation overrides only the kinds it cares about and calls the
//! `walk_*` function itself when it still wants the structural recursion.
//!
//! | kind        | children                                  |
//! |-------------|-------------------------------------------|
//! | Unary       | a                                         |
//! | Binary      | a, b                                      |
//! | Variadic    | operands...                               |
//! | Var         | lower, upper (reduction axes only)        |
//! | Cast        | value                                     |
//! | Select      | condition, true_value, false_value        |
//! | Ramp        | base, stride                              |
//! | Broadcast   | value                                     |
//! | Load        | tensor, indices...                        |
//! | Store       | value, tensor, indices...                 |
//! | For         | min, extent, body                         |
//! | PolyFor     | init, condition, inc, body                |
//! | IfThenElse  | condition, true_case, false_case?         |
//! | Block       | stmts...                                  |
//! | Call        | read_args..., write_args...               |
//! | Alloc       | extents..., condition?, body?             |
//! | Let         | symbol, body?                             |
//! | Reduce      | init, body                                |
//! | Module      | functions..., buffers..., submodules...   |
//! | LoweredFunc | body                                      |
//!
//! `Const`, `Free`, `Tensor` and `Buffer` are leaves.

use std::collections::BTreeSet;

use crate::expr::*;
use crate::tensor::{Buffer, Tensor};
use crate::types::{BinaryOp, UnaryOp, VariadicOp};

// ============================================================================
// Aggregate
// ============================================================================

/// Result type a [`Visitor`] folds over the children of a node.
pub trait Aggregate: Default {
    fn merge(&mut self, other: Self);
}

impl Aggregate for () {
    fn merge(&mut self, _other: Self) {}
}

/// Logical "any".
impl Aggregate for bool {
    fn merge(&mut self, other: Self) {
        *self |= other;
    }
}

/// Sum.
impl Aggregate for usize {
    fn merge(&mut self, other: Self) {
        *self += other;
    }
}

/// Concatenation in traversal order.
impl<T> Aggregate for Vec<T> {
    fn merge(&mut self, mut other: Self) {
        self.append(&mut other);
    }
}

impl<T: Ord> Aggregate for BTreeSet<T> {
    fn merge(&mut self, mut other: Self) {
        self.append(&mut other);
    }
}

// ============================================================================
// Visitor
// ============================================================================

/// Read-only traversal.
pub trait Visitor {
    type Output: Aggregate;

    /// Entry point for every child slot.
    fn visit_expr(&mut self, expr: &Expr) -> Self::Output {
        walk_expr(self, expr)
    }

    fn visit_const(&mut self, _c: &Const) -> Self::Output {
        Self::Output::default()
    }

    fn visit_unary(&mut self, _op: UnaryOp, a: &Expr) -> Self::Output {
        self.visit_expr(a)
    }

    fn visit_binary(&mut self, _op: BinaryOp, a: &Expr, b: &Expr) -> Self::Output {
        walk_list(self, [a, b])
    }

    fn visit_variadic(&mut self, _op: VariadicOp, operands: &[Expr]) -> Self::Output {
        walk_list(self, operands)
    }

    fn visit_var(&mut self, var: &Var) -> Self::Output {
        walk_var(self, var)
    }

    fn visit_cast(&mut self, cast: &Cast) -> Self::Output {
        self.visit_expr(&cast.value)
    }

    fn visit_select(&mut self, select: &Select) -> Self::Output {
        walk_list(self, [&*select.condition, &*select.true_value, &*select.false_value])
    }

    fn visit_ramp(&mut self, ramp: &Ramp) -> Self::Output {
        walk_list(self, [&*ramp.base, &*ramp.stride])
    }

    fn visit_broadcast(&mut self, broadcast: &Broadcast) -> Self::Output {
        self.visit_expr(&broadcast.value)
    }

    fn visit_load(&mut self, load: &Load) -> Self::Output {
        walk_load(self, load)
    }

    fn visit_store(&mut self, store: &Store) -> Self::Output {
        walk_store(self, store)
    }

    fn visit_for(&mut self, for_loop: &For) -> Self::Output {
        walk_for(self, for_loop)
    }

    fn visit_poly_for(&mut self, poly_for: &PolyFor) -> Self::Output {
        walk_poly_for(self, poly_for)
    }

    fn visit_if_then_else(&mut self, if_then_else: &IfThenElse) -> Self::Output {
        walk_if_then_else(self, if_then_else)
    }

    fn visit_block(&mut self, stmts: &[Expr]) -> Self::Output {
        walk_list(self, stmts)
    }

    fn visit_call(&mut self, call: &Call) -> Self::Output {
        walk_list(self, call.read_args.iter().chain(call.write_args.iter()))
    }

    fn visit_alloc(&mut self, alloc: &Alloc) -> Self::Output {
        walk_alloc(self, alloc)
    }

    fn visit_free(&mut self, _free: &Free) -> Self::Output {
        Self::Output::default()
    }

    fn visit_let(&mut self, let_stmt: &Let) -> Self::Output {
        walk_list(self, std::iter::once(&*let_stmt.symbol).chain(let_stmt.body.as_deref()))
    }

    fn visit_reduce(&mut self, reduce: &Reduce) -> Self::Output {
        walk_list(self, [&*reduce.init, &*reduce.body])
    }

    fn visit_module(&mut self, module: &Module) -> Self::Output {
        walk_list(self, module.functions.iter().chain(module.buffers.iter()).chain(module.submodules.iter()))
    }

    fn visit_lowered_func(&mut self, func: &LoweredFunc) -> Self::Output {
        self.visit_expr(&func.body)
    }

    fn visit_tensor(&mut self, _tensor: &TensorRef) -> Self::Output {
        Self::Output::default()
    }

    fn visit_buffer(&mut self, _buffer: &BufferRef) -> Self::Output {
        Self::Output::default()
    }
}

/// Dispatch `expr` to the per-kind hook of `v`.
pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) -> V::Output {
    match expr {
        Expr::Const(c) => v.visit_const(c),
        Expr::Unary(op, a) => v.visit_unary(*op, a),
        Expr::Binary(op, a, b) => v.visit_binary(*op, a, b),
        Expr::Variadic(op, operands) => v.visit_variadic(*op, operands),
        Expr::Var(var) => v.visit_var(var),
        Expr::Cast(c) => v.visit_cast(c),
        Expr::Select(s) => v.visit_select(s),
        Expr::Ramp(r) => v.visit_ramp(r),
        Expr::Broadcast(b) => v.visit_broadcast(b),
        Expr::Load(l) => v.visit_load(l),
        Expr::Store(s) => v.visit_store(s),
        Expr::For(f) => v.visit_for(f),
        Expr::PolyFor(p) => v.visit_poly_for(p),
        Expr::IfThenElse(i) => v.visit_if_then_else(i),
        Expr::Block(stmts) => v.visit_block(stmts),
        Expr::Call(c) => v.visit_call(c),
        Expr::Alloc(a) => v.visit_alloc(a),
        Expr::Free(f) => v.visit_free(f),
        Expr::Let(l) => v.visit_let(l),
        Expr::Reduce(r) => v.visit_reduce(r),
        Expr::Module(m) => v.visit_module(m),
        Expr::LoweredFunc(f) => v.visit_lowered_func(f),
        Expr::Tensor(t) => v.visit_tensor(t),
        Expr::Buffer(b) => v.visit_buffer(b),
    }
}

/// Visit each expression in order and merge the results.
pub fn walk_list<'a, V: Visitor + ?Sized>(v: &mut V, exprs: impl IntoIterator<Item = &'a Expr>) -> V::Output {
    let mut out = V::Output::default();
    for expr in exprs {
        out.merge(v.visit_expr(expr));
    }
    out
}

pub fn walk_var<V: Visitor + ?Sized>(v: &mut V, var: &Var) -> V::Output {
    match &var.bounds {
        Some(bounds) => walk_list(v, [&bounds.lower, &bounds.upper]),
        None => V::Output::default(),
    }
}

pub fn walk_load<V: Visitor + ?Sized>(v: &mut V, load: &Load) -> V::Output {
    walk_list(v, std::iter::once(&*load.tensor).chain(load.indices.iter()))
}

pub fn walk_store<V: Visitor + ?Sized>(v: &mut V, store: &Store) -> V::Output {
    walk_list(v, [&*store.value, &*store.tensor].into_iter().chain(store.indices.iter()))
}

pub fn walk_for<V: Visitor + ?Sized>(v: &mut V, for_loop: &For) -> V::Output {
    walk_list(v, [&*for_loop.min, &*for_loop.extent, &*for_loop.body])
}

pub fn walk_poly_for<V: Visitor + ?Sized>(v: &mut V, poly_for: &PolyFor) -> V::Output {
    walk_list(v, [&*poly_for.init, &*poly_for.condition, &*poly_for.inc, &*poly_for.body])
}

pub fn walk_if_then_else<V: Visitor + ?Sized>(v: &mut V, if_then_else: &IfThenElse) -> V::Output {
    walk_list(
        v,
        [&*if_then_else.condition, &*if_then_else.true_case].into_iter().chain(if_then_else.false_case.as_deref()),
    )
}

pub fn walk_alloc<V: Visitor + ?Sized>(v: &mut V, alloc: &Alloc) -> V::Output {
    walk_list(v, alloc.extents.iter().chain(alloc.condition.as_deref()).chain(alloc.body.as_deref()))
}

// ============================================================================
// Mutator
// ============================================================================

/// In-place rewriting traversal.
///
/// Infallible mutators use [`std::convert::Infallible`] as their error.
pub trait Mutator {
    type Error;

    /// Entry point for every child slot. Overriding this allows replacing the
    /// node held by the slot.
    fn mutate_expr(&mut self, expr: &mut Expr) -> Result<(), Self::Error> {
        walk_expr_mut(self, expr)
    }

    fn mutate_const(&mut self, _c: &mut Const) -> Result<(), Self::Error> {
        Ok(())
    }

    fn mutate_unary(&mut self, _op: UnaryOp, a: &mut Expr) -> Result<(), Self::Error> {
        self.mutate_expr(a)
    }

    fn mutate_binary(&mut self, _op: BinaryOp, a: &mut Expr, b: &mut Expr) -> Result<(), Self::Error> {
        self.mutate_expr(a)?;
        self.mutate_expr(b)
    }

    fn mutate_variadic(&mut self, _op: VariadicOp, operands: &mut [Expr]) -> Result<(), Self::Error> {
        walk_list_mut(self, operands)
    }

    fn mutate_var(&mut self, var: &mut Var) -> Result<(), Self::Error> {
        walk_var_mut(self, var)
    }

    fn mutate_cast(&mut self, cast: &mut Cast) -> Result<(), Self::Error> {
        self.mutate_expr(&mut cast.value)
    }

    fn mutate_select(&mut self, select: &mut Select) -> Result<(), Self::Error> {
        self.mutate_expr(&mut select.condition)?;
        self.mutate_expr(&mut select.true_value)?;
        self.mutate_expr(&mut select.false_value)
    }

    fn mutate_ramp(&mut self, ramp: &mut Ramp) -> Result<(), Self::Error> {
        self.mutate_expr(&mut ramp.base)?;
        self.mutate_expr(&mut ramp.stride)
    }

    fn mutate_broadcast(&mut self, broadcast: &mut Broadcast) -> Result<(), Self::Error> {
        self.mutate_expr(&mut broadcast.value)
    }

    fn mutate_load(&mut self, load: &mut Load) -> Result<(), Self::Error> {
        walk_load_mut(self, load)
    }

    fn mutate_store(&mut self, store: &mut Store) -> Result<(), Self::Error> {
        walk_store_mut(self, store)
    }

    fn mutate_for(&mut self, for_loop: &mut For) -> Result<(), Self::Error> {
        walk_for_mut(self, for_loop)
    }

    fn mutate_poly_for(&mut self, poly_for: &mut PolyFor) -> Result<(), Self::Error> {
        walk_poly_for_mut(self, poly_for)
    }

    fn mutate_if_then_else(&mut self, if_then_else: &mut IfThenElse) -> Result<(), Self::Error> {
        walk_if_then_else_mut(self, if_then_else)
    }

    fn mutate_block(&mut self, stmts: &mut Vec<Expr>) -> Result<(), Self::Error> {
        walk_list_mut(self, stmts)
    }

    fn mutate_call(&mut self, call: &mut Call) -> Result<(), Self::Error> {
        walk_list_mut(self, &mut call.read_args)?;
        walk_list_mut(self, &mut call.write_args)
    }

    fn mutate_alloc(&mut self, alloc: &mut Alloc) -> Result<(), Self::Error> {
        walk_alloc_mut(self, alloc)
    }

    fn mutate_free(&mut self, _free: &mut Free) -> Result<(), Self::Error> {
        Ok(())
    }

    fn mutate_let(&mut self, let_stmt: &mut Let) -> Result<(), Self::Error> {
        self.mutate_expr(&mut let_stmt.symbol)?;
        if let Some(body) = &mut let_stmt.body {
            self.mutate_expr(body)?;
        }
        Ok(())
    }

    fn mutate_reduce(&mut self, reduce: &mut Reduce) -> Result<(), Self::Error> {
        self.mutate_expr(&mut reduce.init)?;
        self.mutate_expr(&mut reduce.body)
    }

    fn mutate_module(&mut self, module: &mut Module) -> Result<(), Self::Error> {
        walk_list_mut(self, &mut module.functions)?;
        walk_list_mut(self, &mut module.buffers)?;
        walk_list_mut(self, &mut module.submodules)
    }

    fn mutate_lowered_func(&mut self, func: &mut LoweredFunc) -> Result<(), Self::Error> {
        self.mutate_expr(&mut func.body)
    }

    fn mutate_tensor(&mut self, _tensor: &mut TensorRef) -> Result<(), Self::Error> {
        Ok(())
    }

    fn mutate_buffer(&mut self, _buffer: &mut BufferRef) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Dispatch the node held by `expr` to the per-kind hook of `m`.
pub fn walk_expr_mut<M: Mutator + ?Sized>(m: &mut M, expr: &mut Expr) -> Result<(), M::Error> {
    match expr {
        Expr::Const(c) => m.mutate_const(c),
        Expr::Unary(op, a) => m.mutate_unary(*op, a),
        Expr::Binary(op, a, b) => m.mutate_binary(*op, a, b),
        Expr::Variadic(op, operands) => m.mutate_variadic(*op, operands),
        Expr::Var(var) => m.mutate_var(var),
        Expr::Cast(c) => m.mutate_cast(c),
        Expr::Select(s) => m.mutate_select(s),
        Expr::Ramp(r) => m.mutate_ramp(r),
        Expr::Broadcast(b) => m.mutate_broadcast(b),
        Expr::Load(l) => m.mutate_load(l),
        Expr::Store(s) => m.mutate_store(s),
        Expr::For(f) => m.mutate_for(f),
        Expr::PolyFor(p) => m.mutate_poly_for(p),
        Expr::IfThenElse(i) => m.mutate_if_then_else(i),
        Expr::Block(stmts) => m.mutate_block(stmts),
        Expr::Call(c) => m.mutate_call(c),
        Expr::Alloc(a) => m.mutate_alloc(a),
        Expr::Free(f) => m.mutate_free(f),
        Expr::Let(l) => m.mutate_let(l),
        Expr::Reduce(r) => m.mutate_reduce(r),
        Expr::Module(md) => m.mutate_module(md),
        Expr::LoweredFunc(f) => m.mutate_lowered_func(f),
        Expr::Tensor(t) => m.mutate_tensor(t),
        Expr::Buffer(b) => m.mutate_buffer(b),
    }
}

pub fn walk_list_mut<M: Mutator + ?Sized>(m: &mut M, exprs: &mut [Expr]) -> Result<(), M::Error> {
    for expr in exprs {
        m.mutate_expr(expr)?;
    }
    Ok(())
}

pub fn walk_var_mut<M: Mutator + ?Sized>(m: &mut M, var: &mut Var) -> Result<(), M::Error> {
    if let Some(bounds) = &mut var.bounds {
        m.mutate_expr(&mut bounds.lower)?;
        m.mutate_expr(&mut bounds.upper)?;
    }
    Ok(())
}

pub fn walk_load_mut<M: Mutator + ?Sized>(m: &mut M, load: &mut Load) -> Result<(), M::Error> {
    m.mutate_expr(&mut load.tensor)?;
    walk_list_mut(m, &mut load.indices)
}

pub fn walk_store_mut<M: Mutator + ?Sized>(m: &mut M, store: &mut Store) -> Result<(), M::Error> {
    m.mutate_expr(&mut store.value)?;
    m.mutate_expr(&mut store.tensor)?;
    walk_list_mut(m, &mut store.indices)
}

pub fn walk_for_mut<M: Mutator + ?Sized>(m: &mut M, for_loop: &mut For) -> Result<(), M::Error> {
    m.mutate_expr(&mut for_loop.min)?;
    m.mutate_expr(&mut for_loop.extent)?;
    m.mutate_expr(&mut for_loop.body)
}

pub fn walk_poly_for_mut<M: Mutator + ?Sized>(m: &mut M, poly_for: &mut PolyFor) -> Result<(), M::Error> {
    m.mutate_expr(&mut poly_for.init)?;
    m.mutate_expr(&mut poly_for.condition)?;
    m.mutate_expr(&mut poly_for.inc)?;
    m.mutate_expr(&mut poly_for.body)
}

pub fn walk_if_then_else_mut<M: Mutator + ?Sized>(m: &mut M, if_then_else: &mut IfThenElse) -> Result<(), M::Error> {
    m.mutate_expr(&mut if_then_else.condition)?;
    m.mutate_expr(&mut if_then_else.true_case)?;
    if let Some(false_case) = &mut if_then_else.false_case {
        m.mutate_expr(false_case)?;
    }
    Ok(())
}

pub fn walk_alloc_mut<M: Mutator + ?Sized>(m: &mut M, alloc: &mut Alloc) -> Result<(), M::Error> {
    walk_list_mut(m, &mut alloc.extents)?;
    if let Some(condition) = &mut alloc.condition {
        m.mutate_expr(condition)?;
    }
    if let Some(body) = &mut alloc.body {
        m.mutate_expr(body)?;
    }
    Ok(())
}

/// Rewrite the expressions held by a tensor record: shape, then body.
pub fn walk_tensor_record_mut<M: Mutator + ?Sized>(m: &mut M, tensor: &mut Tensor) -> Result<(), M::Error> {
    walk_list_mut(m, &mut tensor.shape)?;
    if let Some(body) = &mut tensor.body {
        m.mutate_expr(body)?;
    }
    Ok(())
}

/// Rewrite the expressions held by a buffer record: shape, strides, offset.
pub fn walk_buffer_record_mut<M: Mutator + ?Sized>(m: &mut M, buffer: &mut Buffer) -> Result<(), M::Error> {
    walk_list_mut(m, &mut buffer.shape)?;
    walk_list_mut(m, &mut buffer.strides)?;
    m.mutate_expr(&mut buffer.elem_offset)
}
