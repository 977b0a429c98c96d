//! Tensor dependency graph.
//!
//! One node per tensor, one edge `dependency -> dependent` for every tensor a
//! compute body loads. The inline pass uses the subgraph of inlined tensors
//! to order expansion and to reject cyclic inlining up front.

use std::collections::{BTreeSet, HashMap, VecDeque};

use loom_ir::helpers::collect_store_tensors;
use loom_ir::{Expr, TensorMap};
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use snafu::ensure;

use crate::context::LoweringContext;
use crate::error::*;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, returning its node. Registering twice is a no-op.
    pub fn add_tensor(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), idx);
        idx
    }

    /// Record that `dependent` reads `dependency`.
    pub fn add_dependency(&mut self, dependency: &str, dependent: &str) {
        let from = self.add_tensor(dependency);
        let to = self.add_tensor(dependent);
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Graph of every tensor stored in `expr` and the tensors its body loads.
    ///
    /// Stored names without a tensor record (raw buffers) become isolated nodes.
    pub fn from_stores(expr: &Expr, tensors: &TensorMap) -> Self {
        let mut graph = Self::new();
        for name in collect_store_tensors(expr) {
            graph.add_tensor(&name);
            let Ok(tensor) = tensors.tensor(&name) else { continue };
            for dep in tensor.depend_tensor_names() {
                graph.add_dependency(&dep, &name);
            }
        }
        graph
    }

    /// Graph of the inlined tensors reachable from `roots` through inline bodies.
    ///
    /// Roots that are not inlined are ignored. Every reached tensor must have a
    /// record with an expansion body.
    pub fn inline_subgraph<'a>(roots: impl IntoIterator<Item = &'a str>, ctx: &LoweringContext) -> Result<Self> {
        let mut graph = Self::new();
        let mut queue: VecDeque<String> =
            roots.into_iter().filter(|name| ctx.is_inlined(name)).map(str::to_string).collect();
        let mut seen: BTreeSet<String> = queue.iter().cloned().collect();

        while let Some(name) = queue.pop_front() {
            graph.add_tensor(&name);
            let tensor = ctx.tensors.tensor(&name)?;
            ensure!(tensor.has_body(), MissingInlineExpansionSnafu { tensor: name.clone() });

            for dep in tensor.depend_tensor_names() {
                if !ctx.is_inlined(&dep) {
                    continue;
                }
                graph.add_dependency(&dep, &name);
                if seen.insert(dep.clone()) {
                    queue.push_back(dep);
                }
            }
        }
        Ok(graph)
    }

    /// Tensor names with every dependency before its dependents.
    pub fn toposort(&self) -> Result<Vec<String>> {
        let order = toposort(&self.graph, None)
            .map_err(|cycle| Error::CyclicInline { tensor: self.graph[cycle.node_id()].clone() })?;
        Ok(order.into_iter().map(|idx| self.graph[idx].clone()).collect())
    }

    /// Tensor names with every dependent before its dependencies.
    ///
    /// Expanding in this order replaces an outer inline tensor before the
    /// inline tensors its body exposes.
    pub fn expansion_order(&self) -> Result<Vec<String>> {
        let mut order = self.toposort()?;
        order.reverse();
        Ok(order)
    }

    pub fn dependencies_of(&self, name: &str) -> BTreeSet<String> {
        self.neighbors(name, Direction::Incoming)
    }

    pub fn dependents_of(&self, name: &str) -> BTreeSet<String> {
        self.neighbors(name, Direction::Outgoing)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> BTreeSet<String> {
        let Some(&idx) = self.nodes.get(name) else {
            return BTreeSet::new();
        };
        self.graph.neighbors_directed(idx, direction).map(|n| self.graph[n].clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
