//! Small traversals shared by the lowering passes.

use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;

use crate::expr::*;
use crate::visit::{Mutator, Visitor, walk_expr_mut, walk_load, walk_store};

// ============================================================================
// Substitution
// ============================================================================

struct SubstituteVars<'a> {
    bindings: HashMap<&'a str, &'a Expr>,
}

impl Mutator for SubstituteVars<'_> {
    type Error = Infallible;

    fn mutate_expr(&mut self, expr: &mut Expr) -> Result<(), Infallible> {
        if let Expr::Var(var) = expr
            && let Some(replacement) = self.bindings.get(var.name.as_str())
        {
            // Replacements are not rescanned.
            *expr = (*replacement).clone();
            return Ok(());
        }
        walk_expr_mut(self, expr)
    }

    fn mutate_for(&mut self, for_loop: &mut For) -> Result<(), Infallible> {
        // Bounds are evaluated outside the loop; the body sees the iterator.
        self.mutate_expr(&mut for_loop.min)?;
        self.mutate_expr(&mut for_loop.extent)?;
        let shadowed = self.bindings.remove_entry(for_loop.loop_var.name.as_str());
        self.mutate_expr(&mut for_loop.body)?;
        self.bindings.extend(shadowed);
        Ok(())
    }

    fn mutate_poly_for(&mut self, poly_for: &mut PolyFor) -> Result<(), Infallible> {
        self.mutate_expr(&mut poly_for.init)?;
        let shadowed = self.bindings.remove_entry(poly_for.iterator.name.as_str());
        self.mutate_expr(&mut poly_for.condition)?;
        self.mutate_expr(&mut poly_for.inc)?;
        self.mutate_expr(&mut poly_for.body)?;
        self.bindings.extend(shadowed);
        Ok(())
    }

    /// The initializer sees the outer scope. The symbol is a binder, never a use.
    fn mutate_let(&mut self, let_stmt: &mut Let) -> Result<(), Infallible> {
        match &mut let_stmt.body {
            Some(body) => self.mutate_expr(body),
            None => Ok(()),
        }
    }

    /// A `let` shields the statements after it from its symbol.
    fn mutate_block(&mut self, stmts: &mut Vec<Expr>) -> Result<(), Infallible> {
        let mut shadowed = Vec::new();
        for stmt in stmts.iter_mut() {
            self.mutate_expr(stmt)?;
            if let Expr::Let(let_stmt) = stmt
                && let Some(var) = let_stmt.symbol.as_var()
            {
                shadowed.extend(self.bindings.remove_entry(var.name.as_str()));
            }
        }
        self.bindings.extend(shadowed);
        Ok(())
    }
}

fn run_infallible<M: Mutator<Error = Infallible>>(m: &mut M, expr: &mut Expr) {
    match m.mutate_expr(expr) {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// Replace every free occurrence of the variables in `bindings` at once.
///
/// Inserted expressions are not rescanned, so `{i -> j, j -> i}` swaps the two.
/// A loop that rebinds a name shields its body from that binding.
pub fn substitute_vars(expr: &mut Expr, bindings: &HashMap<&str, &Expr>) {
    if bindings.is_empty() {
        return;
    }
    run_infallible(&mut SubstituteVars { bindings: bindings.clone() }, expr);
}

/// Replace every free occurrence of variable `name` with `replacement`.
pub fn replace_var_with_expr(expr: &mut Expr, name: &str, replacement: &Expr) {
    substitute_vars(expr, &HashMap::from([(name, replacement)]));
}

// ============================================================================
// Collection
// ============================================================================

struct TensorNames;

impl Visitor for TensorNames {
    type Output = BTreeSet<String>;

    fn visit_tensor(&mut self, tensor: &TensorRef) -> Self::Output {
        BTreeSet::from([tensor.name.clone()])
    }
}

/// Every tensor handle that appears anywhere in `expr`.
pub fn collect_tensor_names(expr: &Expr) -> BTreeSet<String> {
    TensorNames.visit_expr(expr)
}

struct LoadTensors<F> {
    filter: F,
}

impl<F: Fn(&str) -> bool> Visitor for LoadTensors<F> {
    type Output = BTreeSet<String>;

    fn visit_load(&mut self, load: &Load) -> Self::Output {
        let mut out = walk_load(self, load);
        if let Some(name) = load.tensor_name()
            && (self.filter)(name)
        {
            out.insert(name.to_string());
        }
        out
    }
}

/// Names of the tensors loaded in `expr` that pass `filter`.
pub fn collect_load_tensors(expr: &Expr, filter: impl Fn(&str) -> bool) -> BTreeSet<String> {
    LoadTensors { filter }.visit_expr(expr)
}

struct StoreTargets;

impl Visitor for StoreTargets {
    type Output = BTreeSet<String>;

    fn visit_store(&mut self, store: &Store) -> Self::Output {
        let mut out = walk_store(self, store);
        if let Some(name) = store.target_name() {
            out.insert(name.to_string());
        }
        out
    }
}

/// Names of the tensors and buffers written in `expr`.
pub fn collect_store_tensors(expr: &Expr) -> BTreeSet<String> {
    StoreTargets.visit_expr(expr)
}

struct StoresTo<'a> {
    target: &'a str,
}

impl Visitor for StoresTo<'_> {
    type Output = bool;

    fn visit_store(&mut self, store: &Store) -> bool {
        store.target_name() == Some(self.target) || walk_store(self, store)
    }
}

pub fn contains_store_to(expr: &Expr, tensor: &str) -> bool {
    StoresTo { target: tensor }.visit_expr(expr)
}

struct ReferencesVar<'a> {
    name: &'a str,
}

impl Visitor for ReferencesVar<'_> {
    type Output = bool;

    fn visit_var(&mut self, var: &Var) -> bool {
        var.name == self.name || crate::visit::walk_var(self, var)
    }
}

/// True if a variable named `name` occurs anywhere in `expr`.
pub fn references_var(expr: &Expr, name: &str) -> bool {
    ReferencesVar { name }.visit_expr(expr)
}

struct StoreIndices<'a> {
    target: &'a str,
}

impl Visitor for StoreIndices<'_> {
    type Output = Vec<Vec<Expr>>;

    fn visit_store(&mut self, store: &Store) -> Self::Output {
        let mut out = Vec::new();
        if store.target_name() == Some(self.target) {
            out.push(store.indices.clone());
        }
        out.extend(walk_store(self, store));
        out
    }
}

/// Index lists of every store to `tensor`, in traversal order.
pub fn find_store_indices(expr: &Expr, tensor: &str) -> Vec<Vec<Expr>> {
    StoreIndices { target: tensor }.visit_expr(expr)
}
