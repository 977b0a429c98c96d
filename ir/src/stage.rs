//! Per-tensor scheduling metadata.
//!
//! Stages are produced by the scheduler before lowering starts and stay
//! read-only while the lowering passes run.

use std::collections::{BTreeMap, HashMap};

use smallvec::SmallVec;
use snafu::ensure;

use crate::error::*;
use crate::expr::Expr;
use crate::types::{DeviceAxis, MemoryScope};

/// Loop iterator name to the device axis it is bound to.
pub type AxisBindings = BTreeMap<String, DeviceAxis>;

/// Tensor name to the device-axis bindings of its loop nest.
pub type ForloopInfos = BTreeMap<String, AxisBindings>;

/// Nest this stage inside loop `level` of `parent`'s loop nest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComputeAt {
    pub parent: String,
    pub level: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub tensor: String,
    pub inlined: bool,
    pub scope: MemoryScope,
    pub compute_ats: SmallVec<[ComputeAt; 1]>,
    /// Ordered loop iterator names, outermost first.
    pub axis_names: Vec<String>,
    /// Extent of each axis in `axis_names`.
    pub axis_extents: Vec<Expr>,
    pub forloop_infos: AxisBindings,
}

impl Stage {
    pub fn new(tensor: impl Into<String>) -> Self {
        Self {
            tensor: tensor.into(),
            inlined: false,
            scope: MemoryScope::Heap,
            compute_ats: SmallVec::new(),
            axis_names: Vec::new(),
            axis_extents: Vec::new(),
            forloop_infos: BTreeMap::new(),
        }
    }

    pub fn inline(mut self) -> Self {
        self.inlined = true;
        self
    }

    pub fn with_scope(mut self, scope: MemoryScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn compute_at(mut self, parent: impl Into<String>, level: usize) -> Self {
        self.compute_ats.push(ComputeAt { parent: parent.into(), level });
        self
    }

    /// Set the loop axes as `(name, extent)` pairs, outermost first.
    pub fn with_axes<S: Into<String>>(mut self, axes: impl IntoIterator<Item = (S, Expr)>) -> Self {
        let (names, extents): (Vec<String>, Vec<Expr>) =
            axes.into_iter().map(|(name, extent)| (name.into(), extent)).unzip();
        self.axis_names = names;
        self.axis_extents = extents;
        self
    }

    /// Bind loop iterator `iterator` to `axis`.
    pub fn bind(mut self, iterator: impl Into<String>, axis: DeviceAxis) -> Self {
        self.forloop_infos.insert(iterator.into(), axis);
        self
    }

    pub fn axis_extent(&self, name: &str) -> Option<&Expr> {
        let pos = self.axis_names.iter().position(|n| n == name)?;
        self.axis_extents.get(pos)
    }

    /// The compute-at relation, if any. More than one parent is an error.
    pub fn single_compute_at(&self) -> Result<Option<&ComputeAt>> {
        ensure!(
            self.compute_ats.len() <= 1,
            MultipleComputeAtSnafu { tensor: self.tensor.clone(), count: self.compute_ats.len() }
        );
        Ok(self.compute_ats.first())
    }
}

/// Stages keyed by tensor name, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageMap {
    stages: Vec<Stage>,
    index: HashMap<String, usize>,
}

impl StageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `stage`, replacing an existing stage of the same tensor in place.
    pub fn insert(&mut self, stage: Stage) {
        match self.index.get(&stage.tensor) {
            Some(&pos) => self.stages[pos] = stage,
            None => {
                self.index.insert(stage.tensor.clone(), self.stages.len());
                self.stages.push(stage);
            }
        }
    }

    pub fn get(&self, tensor: &str) -> Option<&Stage> {
        self.index.get(tensor).map(|&pos| &self.stages[pos])
    }

    pub fn contains(&self, tensor: &str) -> bool {
        self.index.contains_key(tensor)
    }

    pub fn is_inlined(&self, tensor: &str) -> bool {
        self.get(tensor).is_some_and(|s| s.inlined)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Device-axis bindings of every stage that has any.
    pub fn forloop_infos(&self) -> ForloopInfos {
        self.stages
            .iter()
            .filter(|s| !s.forloop_infos.is_empty())
            .map(|s| (s.tensor.clone(), s.forloop_infos.clone()))
            .collect()
    }
}

impl FromIterator<Stage> for StageMap {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        let mut map = Self::new();
        for stage in iter {
            map.insert(stage);
        }
        map
    }
}
