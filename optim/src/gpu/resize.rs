//! Shrinking of GPU temporary buffers.
//!
//! A shared-memory buffer is private to one block, so the block index it is
//! written at carries no information: that dimension shrinks to one element.
//! A thread-local buffer additionally drops its thread dimensions.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::convert::Infallible;

use loom_ir::helpers::{find_store_indices, substitute_vars};
use loom_ir::visit::{walk_alloc_mut, walk_load_mut, walk_store_mut, walk_var};
use loom_ir::{Alloc, DeviceAxis, Expr, LaunchDims, Load, MemoryScope, Mutator, Store, Var, Visitor};
use snafu::ensure;
use tracing::debug;

use crate::context::LoweringContext;
use crate::error::*;

/// Buffers shrunk during one lowering run, with their new shapes.
///
/// Several loop nests may write the same temp buffer. The first resize wins;
/// a later request for the same shape is a no-op and a different shape is an
/// error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResizedBuffers {
    shapes: BTreeMap<String, Vec<Expr>>,
}

impl ResizedBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `shape` for `buffer`. Returns false if it was already recorded.
    pub fn record(&mut self, buffer: &str, shape: Vec<Expr>) -> Result<bool> {
        if let Some(existing) = self.shapes.get(buffer) {
            ensure!(
                *existing == shape,
                BufferResizeConflictSnafu { buffer, existing: existing.clone(), requested: shape }
            );
            return Ok(false);
        }
        self.shapes.insert(buffer.to_string(), shape);
        Ok(true)
    }

    pub fn get(&self, buffer: &str) -> Option<&[Expr]> {
        self.shapes.get(buffer).map(Vec::as_slice)
    }

    pub fn contains(&self, buffer: &str) -> bool {
        self.shapes.contains_key(buffer)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Expr])> {
        self.shapes.iter().map(|(name, shape)| (name.as_str(), shape.as_slice()))
    }
}

/// Device axes whose index is uniform within one buffer of `scope`.
fn is_eliminated(scope: MemoryScope, axis: DeviceAxis) -> bool {
    match scope {
        MemoryScope::GpuLocal => true,
        MemoryScope::GpuShared => axis.is_block(),
        MemoryScope::Heap | MemoryScope::Stack => false,
    }
}

struct FreeVars;

impl Visitor for FreeVars {
    type Output = BTreeSet<String>;

    fn visit_var(&mut self, var: &Var) -> Self::Output {
        let mut out = walk_var(self, var);
        out.insert(var.name.clone());
        out
    }
}

fn device_axes(expr: &Expr) -> BTreeSet<DeviceAxis> {
    FreeVars.visit_expr(expr).iter().filter_map(|name| DeviceAxis::from_name(name)).collect()
}

/// Bindings that zero every eliminated axis occurring in `indices`.
fn eliminated_axes(scope: MemoryScope, indices: &[Expr]) -> Vec<(String, Expr)> {
    indices
        .iter()
        .flat_map(device_axes)
        .filter(|&axis| is_eliminated(scope, axis))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|axis| (axis.name(), Expr::zero()))
        .collect()
}

fn zero_axes(index: &mut Expr, eliminated: &[(String, Expr)]) {
    let bindings: HashMap<&str, &Expr> = eliminated.iter().map(|(name, zero)| (name.as_str(), zero)).collect();
    substitute_vars(index, &bindings);
}

/// Shape of a temp buffer of `scope` written at `indices`.
///
/// Per dimension, after zeroing the eliminated axes in its index:
/// - no variable left: the dimension holds a single element
/// - exactly one thread axis left: the launch extent of that axis
/// - otherwise the original extent
///
/// Dimensions whose index never mentions a device axis keep their extent.
/// Returns `None` for scopes that are not GPU temporaries.
pub fn resized_shape(shape: &[Expr], indices: &[Expr], scope: MemoryScope, launch: &LaunchDims) -> Option<Vec<Expr>> {
    if !scope.is_gpu_temp() {
        return None;
    }
    let eliminated = eliminated_axes(scope, indices);

    let shape = shape
        .iter()
        .enumerate()
        .map(|(d, extent)| {
            let Some(index) = indices.get(d) else {
                return extent.clone();
            };
            if device_axes(index).is_empty() {
                return extent.clone();
            }
            let mut residual = index.clone();
            zero_axes(&mut residual, &eliminated);
            match &residual {
                Expr::Var(var) => match DeviceAxis::from_name(&var.name) {
                    Some(axis) if axis.is_thread() => Expr::int(launch.extent(axis)),
                    _ => extent.clone(),
                },
                residual if FreeVars.visit_expr(residual).is_empty() => Expr::int(1),
                _ => extent.clone(),
            }
        })
        .collect();
    Some(shape)
}

/// Zero the eliminated axes in every access to one buffer.
struct ZeroUniformAxes<'a> {
    targets: [&'a str; 2],
    eliminated: &'a [(String, Expr)],
}

impl ZeroUniformAxes<'_> {
    fn is_target(&self, name: Option<&str>) -> bool {
        name.is_some_and(|name| self.targets.contains(&name))
    }
}

impl Mutator for ZeroUniformAxes<'_> {
    type Error = Infallible;

    fn mutate_load(&mut self, load: &mut Load) -> Result<(), Infallible> {
        walk_load_mut(self, load)?;
        if self.is_target(load.target_name()) {
            load.indices.iter_mut().for_each(|index| zero_axes(index, self.eliminated));
        }
        Ok(())
    }

    fn mutate_store(&mut self, store: &mut Store) -> Result<(), Infallible> {
        walk_store_mut(self, store)?;
        if self.is_target(store.target_name()) {
            store.indices.iter_mut().for_each(|index| zero_axes(index, self.eliminated));
        }
        Ok(())
    }
}

/// Rewrite the extents of allocations of one buffer.
struct ResizeAllocs<'a> {
    buffer: &'a str,
    extents: &'a [Expr],
}

impl Mutator for ResizeAllocs<'_> {
    type Error = Infallible;

    fn mutate_alloc(&mut self, alloc: &mut Alloc) -> Result<(), Infallible> {
        if alloc.buffer.name == self.buffer {
            alloc.extents = self.extents.to_vec();
        }
        walk_alloc_mut(self, alloc)
    }
}

/// Shrink the temp buffer behind `tensor` and rewrite its accesses.
///
/// The shape is derived from the first store to `tensor` in `expr`. Tensors
/// without a GPU-temporary buffer are left alone.
pub(crate) fn resize_temp_buffer(
    ctx: &mut LoweringContext,
    tensor: &str,
    launch: &LaunchDims,
    resized: &mut ResizedBuffers,
    expr: &mut Expr,
) -> Result<()> {
    let Some(buffer) = ctx.tensors.tensor_buffer(tensor) else {
        return Ok(());
    };
    let Some(indices) = find_store_indices(expr, tensor).into_iter().next() else {
        return Ok(());
    };
    let scope = buffer.scope;
    let Some(shape) = resized_shape(&buffer.shape, &indices, scope, launch) else {
        return Ok(());
    };
    let buffer_name = buffer.name.clone();

    if resized.record(&buffer_name, shape.clone())? {
        debug!(buffer = %buffer_name, ?scope, ?shape, "resized temp buffer");
        ctx.tensors.buffer_mut(&buffer_name)?.shape = shape.iter().cloned().collect();
        run(&mut ResizeAllocs { buffer: &buffer_name, extents: &shape }, expr);
    }

    let eliminated = eliminated_axes(scope, &indices);
    run(&mut ZeroUniformAxes { targets: [tensor, &buffer_name], eliminated: &eliminated }, expr);
    Ok(())
}

fn run<M: Mutator<Error = Infallible>>(m: &mut M, expr: &mut Expr) {
    match m.mutate_expr(expr) {
        Ok(()) => {}
        Err(never) => match never {},
    }
}
