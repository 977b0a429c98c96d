//! Common imports for building and rewriting IR trees.
//!
//! ```rust,ignore
//! use loom_ir::prelude::*;
//! ```

// Node model
pub use crate::expr::{Expr, For, Load, LoweredFunc, Store, Var};

// Arena and metadata
pub use crate::stage::{Stage, StageMap};
pub use crate::tensor::{Buffer, Tensor, TensorMap};

// Operation and scheduling types
pub use crate::types::{AxisDim, BinaryOp, ConstValue, DeviceAxis, ForKind, MemoryScope};

// Traversal
pub use crate::visit::{Aggregate, Mutator, Visitor};

// Re-exports from dependencies
pub use loom_dtype::DType;
