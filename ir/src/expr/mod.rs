//! Expression tree of the loop-nest IR.
//!
//! The [`Expr`] enum is the closed set of node kinds. Every child is owned by
//! its parent (`Box<Expr>` / `Vec<Expr>`); the tree has no shared or cyclic
//! links. Tensors and buffers appear only as name handles ([`TensorRef`],
//! [`BufferRef`]) that resolve through the [`TensorMap`](crate::TensorMap)
//! arena.
//!
//! Design choices:
//! - Fixed-arity arithmetic grouped by arity: `Unary`, `Binary`
//! - Variable-arity nodes use `Vec<Expr>` (an inline `SmallVec<[Expr; N]>`
//!   would make the type infinitely sized)
//! - Statement nodes with several fields get their own struct so visitor and
//!   mutator hooks can take them by reference

pub mod constructors;
pub mod display;
pub mod tree;

use loom_dtype::DType;
use smallvec::SmallVec;

use crate::launch::LaunchDims;
use crate::types::*;

/// Immediate constant.
#[derive(Debug, Clone, PartialEq)]
pub struct Const {
    pub value: ConstValue,
    pub dtype: DType,
}

/// Lower/upper bound of a reduction axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceBounds {
    pub lower: Expr,
    pub upper: Expr,
}

/// Named symbol. Reduction axes own their iteration bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub name: String,
    pub dtype: DType,
    pub bounds: Option<Box<ReduceBounds>>,
}

impl Var {
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Self { name: name.into(), dtype, bounds: None }
    }

    /// Reduction axis iterating over `[lower, upper)`.
    pub fn reduce_axis(name: impl Into<String>, lower: Expr, upper: Expr) -> Self {
        Self { name: name.into(), dtype: DType::Int32, bounds: Some(Box::new(ReduceBounds { lower, upper })) }
    }

    pub fn is_reduce_axis(&self) -> bool {
        self.bounds.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    pub value: Box<Expr>,
    pub dtype: DType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub condition: Box<Expr>,
    pub true_value: Box<Expr>,
    pub false_value: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ramp {
    pub base: Box<Expr>,
    pub stride: Box<Expr>,
    pub lanes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    pub value: Box<Expr>,
    pub lanes: usize,
}

/// Handle of a tensor record in the arena.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorRef {
    pub name: String,
}

/// Handle of a buffer record in the arena.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferRef {
    pub name: String,
}

/// Read of `tensor[indices...]`. `tensor` is an [`Expr::Tensor`] or
/// [`Expr::Buffer`] handle so a mutator can redirect it by overwriting the slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    pub tensor: Box<Expr>,
    pub indices: Vec<Expr>,
}

impl Load {
    /// Name of the loaded tensor, if the target is a tensor handle.
    pub fn tensor_name(&self) -> Option<&str> {
        self.tensor.as_tensor_ref().map(|t| t.name.as_str())
    }

    /// Name of the loaded tensor or buffer.
    pub fn target_name(&self) -> Option<&str> {
        self.tensor.handle_name()
    }
}

/// Write of `value` into `tensor[indices...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub tensor: Box<Expr>,
    pub value: Box<Expr>,
    pub indices: Vec<Expr>,
}

impl Store {
    pub fn tensor_name(&self) -> Option<&str> {
        self.tensor.as_tensor_ref().map(|t| t.name.as_str())
    }

    pub fn target_name(&self) -> Option<&str> {
        self.tensor.handle_name()
    }
}

/// Counted loop `for (loop_var = min; loop_var < min + extent; ++loop_var)`.
#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub loop_var: Var,
    pub min: Box<Expr>,
    pub extent: Box<Expr>,
    pub body: Box<Expr>,
    pub kind: ForKind,
}

/// Loop produced by the polyhedral scheduler: init / condition / increment.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyFor {
    pub iterator: Var,
    pub init: Box<Expr>,
    pub condition: Box<Expr>,
    pub inc: Box<Expr>,
    pub body: Box<Expr>,
    pub kind: ForKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfThenElse {
    pub condition: Box<Expr>,
    pub true_case: Box<Expr>,
    pub false_case: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub kind: CallKind,
    pub dtype: DType,
    pub read_args: Vec<Expr>,
    pub write_args: Vec<Expr>,
}

/// Scoped allocation of a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Alloc {
    pub buffer: BufferRef,
    pub extents: Vec<Expr>,
    pub condition: Option<Box<Expr>>,
    pub body: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Free {
    pub buffer: BufferRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Let {
    pub symbol: Box<Expr>,
    pub body: Option<Box<Expr>>,
}

/// Reduction: `init` seeds the accumulator, `body` is one accumulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduce {
    pub op: ReduceOp,
    pub init: Box<Expr>,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Expr>,
    pub buffers: Vec<Expr>,
    pub submodules: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub kind: ArgumentKind,
}

/// Device-ready function: a body statement plus its signature metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredFunc {
    pub name: String,
    pub args: Vec<Argument>,
    pub body: Box<Expr>,
    /// Launch dimensions, filled by the device-axis binding pass.
    pub launch: LaunchDims,
}

/// IR node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Leaves
    Const(Const),

    // Arithmetic and logic
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Variadic(VariadicOp, Vec<Expr>),

    Var(Var),
    Cast(Cast),
    Select(Select),
    Ramp(Ramp),
    Broadcast(Broadcast),

    // Memory
    Load(Load),
    Store(Store),

    // Control flow
    For(For),
    PolyFor(PolyFor),
    IfThenElse(IfThenElse),
    Block(Vec<Expr>),
    Call(Call),

    // Scoping
    Alloc(Alloc),
    Free(Free),
    Let(Let),
    Reduce(Reduce),

    // Containers
    Module(Module),
    LoweredFunc(LoweredFunc),

    // Arena handles
    Tensor(TensorRef),
    Buffer(BufferRef),
}

/// Empty block; the placeholder left behind by `std::mem::take`.
impl Default for Expr {
    fn default() -> Self {
        Self::Block(Vec::new())
    }
}

impl Expr {
    /// Ordered references to every owned child, in traversal order.
    pub fn children(&self) -> SmallVec<[&Expr; 4]> {
        let mut out: SmallVec<[&Expr; 4]> = SmallVec::new();
        match self {
            Self::Const(_) | Self::Free(_) | Self::Tensor(_) | Self::Buffer(_) => {}
            Self::Unary(_, a) => out.push(a),
            Self::Binary(_, a, b) => out.extend([&**a, &**b]),
            Self::Variadic(_, operands) => out.extend(operands.iter()),
            Self::Var(var) => {
                if let Some(bounds) = &var.bounds {
                    out.extend([&bounds.lower, &bounds.upper]);
                }
            }
            Self::Cast(c) => out.push(&c.value),
            Self::Select(s) => out.extend([&*s.condition, &*s.true_value, &*s.false_value]),
            Self::Ramp(r) => out.extend([&*r.base, &*r.stride]),
            Self::Broadcast(b) => out.push(&b.value),
            Self::Load(l) => {
                out.push(&l.tensor);
                out.extend(l.indices.iter());
            }
            Self::Store(s) => {
                out.extend([&*s.value, &*s.tensor]);
                out.extend(s.indices.iter());
            }
            Self::For(f) => out.extend([&*f.min, &*f.extent, &*f.body]),
            Self::PolyFor(p) => out.extend([&*p.init, &*p.condition, &*p.inc, &*p.body]),
            Self::IfThenElse(i) => {
                out.extend([&*i.condition, &*i.true_case]);
                out.extend(i.false_case.as_deref());
            }
            Self::Block(stmts) => out.extend(stmts.iter()),
            Self::Call(c) => out.extend(c.read_args.iter().chain(c.write_args.iter())),
            Self::Alloc(a) => {
                out.extend(a.extents.iter());
                out.extend(a.condition.as_deref());
                out.extend(a.body.as_deref());
            }
            Self::Let(l) => {
                out.push(&l.symbol);
                out.extend(l.body.as_deref());
            }
            Self::Reduce(r) => out.extend([&*r.init, &*r.body]),
            Self::Module(m) => out.extend(m.functions.iter().chain(m.buffers.iter()).chain(m.submodules.iter())),
            Self::LoweredFunc(f) => out.push(&f.body),
        }
        out
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Kind name used by tree rendering and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Const(_) => "Const",
            Self::Unary(..) => "Unary",
            Self::Binary(..) => "Binary",
            Self::Variadic(..) => "Variadic",
            Self::Var(_) => "Var",
            Self::Cast(_) => "Cast",
            Self::Select(_) => "Select",
            Self::Ramp(_) => "Ramp",
            Self::Broadcast(_) => "Broadcast",
            Self::Load(_) => "Load",
            Self::Store(_) => "Store",
            Self::For(_) => "For",
            Self::PolyFor(_) => "PolyFor",
            Self::IfThenElse(_) => "IfThenElse",
            Self::Block(_) => "Block",
            Self::Call(_) => "Call",
            Self::Alloc(_) => "Alloc",
            Self::Free(_) => "Free",
            Self::Let(_) => "Let",
            Self::Reduce(_) => "Reduce",
            Self::Module(_) => "Module",
            Self::LoweredFunc(_) => "LoweredFunc",
            Self::Tensor(_) => "Tensor",
            Self::Buffer(_) => "Buffer",
        }
    }

    pub fn as_const_int(&self) -> Option<i64> {
        match self {
            Self::Const(c) => c.value.as_int(),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Const(c) if c.value.is_zero())
    }

    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Self::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_tensor_ref(&self) -> Option<&TensorRef> {
        match self {
            Self::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_buffer_ref(&self) -> Option<&BufferRef> {
        match self {
            Self::Buffer(b) => Some(b),
            _ => None,
        }
    }

    /// Name of a tensor or buffer handle.
    pub fn handle_name(&self) -> Option<&str> {
        match self {
            Self::Tensor(t) => Some(&t.name),
            Self::Buffer(b) => Some(&b.name),
            _ => None,
        }
    }

    pub fn as_lowered_func(&self) -> Option<&LoweredFunc> {
        match self {
            Self::LoweredFunc(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_lowered_func_mut(&mut self) -> Option<&mut LoweredFunc> {
        match self {
            Self::LoweredFunc(f) => Some(f),
            _ => None,
        }
    }

    /// True for the barrier intrinsic inserted before divergent shared writes.
    pub fn is_sync_threads(&self) -> bool {
        matches!(self, Self::Call(c) if c.kind == CallKind::Intrinsic && c.name == SYNC_THREADS)
    }
}
