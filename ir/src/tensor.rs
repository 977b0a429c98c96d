//! Tensor and buffer records.
//!
//! The tree never owns tensor or buffer descriptors; loads and stores carry a
//! name handle that resolves through [`TensorMap`]. One map exists per
//! compilation unit.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use loom_dtype::DType;
use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::expr::{Expr, Var};
use crate::helpers::{collect_load_tensors, substitute_vars};
use crate::types::MemoryScope;

/// Short per-record dimension list.
pub type Shape = SmallVec<[Expr; 4]>;

/// Tensor record: a named value with an optional defining formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
    /// Formal index variables the body is parameterized over, one per axis.
    pub axes: SmallVec<[Var; 4]>,
    /// Defining expression, used when the tensor is inlined.
    pub body: Option<Expr>,
    /// Name of the backing buffer record.
    pub buffer: Option<String>,
}

impl Tensor {
    pub fn new(name: impl Into<String>, dtype: DType, shape: impl IntoIterator<Item = Expr>) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape: shape.into_iter().collect(),
            axes: SmallVec::new(),
            body: None,
            buffer: None,
        }
    }

    /// Attach a defining formula over the formal index variables `axes`.
    pub fn with_body(mut self, axes: impl IntoIterator<Item = Var>, body: Expr) -> Self {
        self.axes = axes.into_iter().collect();
        self.body = Some(body);
        self
    }

    pub fn with_buffer(mut self, buffer: impl Into<String>) -> Self {
        self.buffer = Some(buffer.into());
        self
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Copy of the body with `indices` bound positionally to the formal axes.
    ///
    /// Binding is simultaneous: an actual index mentioning a formal name is
    /// not substituted again.
    pub fn inline_expanded(&self, indices: &[Expr]) -> Result<Expr> {
        let body = self.body.as_ref().context(MissingInlineExpansionSnafu { tensor: self.name.clone() })?;
        ensure!(
            indices.len() == self.axes.len(),
            ArityMismatchSnafu { tensor: self.name.clone(), expected: self.axes.len(), got: indices.len() }
        );

        let bindings: HashMap<&str, &Expr> =
            self.axes.iter().map(|axis| axis.name.as_str()).zip(indices.iter()).collect();
        let mut expanded = body.clone();
        substitute_vars(&mut expanded, &bindings);
        tracing::trace!(tensor = %self.name, nodes = expanded.node_count(), "inline body instantiated");
        Ok(expanded)
    }

    /// Names of the tensors the body loads from.
    pub fn depend_tensor_names(&self) -> BTreeSet<String> {
        self.body.as_ref().map(|body| collect_load_tensors(body, |_| true)).unwrap_or_default()
    }
}

/// Buffer record: the storage a tensor is materialized into.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
    pub strides: Shape,
    pub elem_offset: Expr,
    pub scope: MemoryScope,
}

impl Buffer {
    pub fn new(name: impl Into<String>, dtype: DType, shape: impl IntoIterator<Item = Expr>) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape: shape.into_iter().collect(),
            strides: SmallVec::new(),
            elem_offset: Expr::zero(),
            scope: MemoryScope::Heap,
        }
    }

    pub fn with_scope(mut self, scope: MemoryScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_strides(mut self, strides: impl IntoIterator<Item = Expr>) -> Self {
        self.strides = strides.into_iter().collect();
        self
    }

    /// Shape as constants, if every dimension is one.
    pub fn const_shape(&self) -> Option<Vec<i64>> {
        self.shape.iter().map(Expr::as_const_int).collect()
    }
}

/// Name-keyed arena of tensor and buffer records.
///
/// Inserting a record under an existing name replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorMap {
    tensors: BTreeMap<String, Tensor>,
    buffers: BTreeMap<String, Buffer>,
}

impl TensorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_tensor(&mut self, tensor: Tensor) -> Option<Tensor> {
        self.tensors.insert(tensor.name.clone(), tensor)
    }

    pub fn insert_buffer(&mut self, buffer: Buffer) -> Option<Buffer> {
        self.buffers.insert(buffer.name.clone(), buffer)
    }

    pub fn contains_tensor(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    pub fn tensor(&self, name: &str) -> Result<&Tensor> {
        self.tensors.get(name).context(UnknownTensorSnafu { name })
    }

    pub fn buffer(&self, name: &str) -> Result<&Buffer> {
        self.buffers.get(name).context(UnknownBufferSnafu { name })
    }

    pub fn buffer_mut(&mut self, name: &str) -> Result<&mut Buffer> {
        self.buffers.get_mut(name).context(UnknownBufferSnafu { name })
    }

    /// Backing buffer of `tensor`, if the tensor exists and has one.
    pub fn tensor_buffer(&self, tensor: &str) -> Option<&Buffer> {
        let buffer = self.tensors.get(tensor)?.buffer.as_deref()?;
        self.buffers.get(buffer)
    }

    /// Memory scope of the buffer behind `tensor`.
    pub fn scope_of(&self, tensor: &str) -> Option<MemoryScope> {
        self.tensor_buffer(tensor).map(|b| b.scope)
    }

    pub fn tensors(&self) -> impl Iterator<Item = &Tensor> {
        self.tensors.values()
    }

    pub fn buffers(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.values()
    }
}
