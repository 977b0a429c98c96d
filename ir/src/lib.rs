//! Loop-nest intermediate representation for the loom compiler.
//!
//! This crate defines the IR tree the lowering passes rewrite, the arena of
//! tensor and buffer records it refers to by name, and the per-tensor stage
//! metadata produced by the scheduler.
//!
//! # Module Organization
//!
//! - [`types`] - Operator kinds, constants, memory scopes, device axes
//! - [`expr`] - The [`Expr`] node model, constructors and rendering
//! - [`launch`] - Launch dimensions attached to lowered functions
//! - [`tensor`] - Tensor/buffer records and the [`TensorMap`] arena
//! - [`stage`] - Scheduling metadata ([`Stage`], [`StageMap`])
//! - [`visit`] - [`Visitor`] / [`Mutator`] traversal framework
//! - [`helpers`] - Substitution and collection traversals
//! - [`error`] - Error types and result handling

pub mod error;
pub mod expr;
pub mod helpers;
pub mod launch;
pub mod prelude;
pub mod stage;
pub mod tensor;
pub mod types;
pub mod visit;


pub use error::{Error, Result};
pub use expr::{
    Alloc, Argument, Broadcast, BufferRef, Call, Cast, Const, Expr, For, Free, IfThenElse, Let, Load, LoweredFunc,
    Module, PolyFor, Ramp, Reduce, ReduceBounds, Select, Store, TensorRef, Var,
};
pub use launch::LaunchDims;
pub use stage::{AxisBindings, ComputeAt, ForloopInfos, Stage, StageMap};
pub use tensor::{Buffer, Shape, Tensor, TensorMap};
pub use types::{
    ArgumentKind, AxisDim, BinaryOp, CallKind, ConstValue, DeviceAxis, ForKind, MemoryScope, ReduceOp, UnaryOp,
    VariadicOp,
};
pub use visit::{Aggregate, Mutator, Visitor};

pub use loom_dtype::DType;
