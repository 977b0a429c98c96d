//! Type definitions for IR nodes.
//!
//! Operator kinds, constant values, memory scopes and the device-axis tags
//! that the scheduler attaches to loops.

use std::fmt;

use loom_dtype::DType;

use crate::expr::{Expr, Var};

/// Suffix of buffers introduced by a write-cache schedule primitive.
pub const WRITE_CACHE_SUFFIX: &str = "_write_cache";
/// Suffix of buffers introduced by a read-cache schedule primitive.
pub const READ_CACHE_SUFFIX: &str = "_read_cache";
/// Suffix of scratch buffers created during lowering.
pub const TEMP_BUFFER_SUFFIX: &str = "_temp_buffer";

pub const BLOCK_IDX_PREFIX: &str = "blockIdx";
pub const THREAD_IDX_PREFIX: &str = "threadIdx";

/// Intrinsic emitted as the cross-thread barrier.
pub const SYNC_THREADS: &str = "__syncthreads";

/// Returns true if `name` carries one of the cache/scratch suffixes.
pub fn is_temp_buffer_name(name: &str) -> bool {
    name.ends_with(WRITE_CACHE_SUFFIX) || name.ends_with(READ_CACHE_SUFFIX) || name.ends_with(TEMP_BUFFER_SUFFIX)
}

/// Constant value stored in an immediate.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl ConstValue {
    /// Integral value, if this constant is an integer of either signedness.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(v) => *v == 0,
            Self::UInt(v) => *v == 0,
            Self::Float(v) => *v == 0.0,
            Self::Bool(v) => !*v,
            Self::Str(_) => false,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}u"),
            Self::Float(v) => write!(f, "{v:?}f"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Unary operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum UnaryOp {
    /// Arithmetic negation: -x
    Neg,
    /// Logical negation: !x
    Not,
}

impl UnaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }
}

/// Binary operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumIter)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    And,
    Or,

    /// Fraction `a / b` kept symbolic (not truncated).
    Frac,
    /// Power `a ^ b`.
    Pow,
}

impl BinaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Min => "min",
            Self::Max => "max",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Frac => "/",
            Self::Pow => "pow",
        }
    }

    /// Operators rendered in call syntax rather than infix.
    pub const fn is_call_style(self) -> bool {
        matches!(self, Self::Min | Self::Max | Self::Pow)
    }

    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub const fn is_commutative(self) -> bool {
        matches!(self, Self::Add | Self::Mul | Self::Min | Self::Max | Self::Eq | Self::Ne | Self::And | Self::Or)
    }
}

/// Commutative n-ary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum VariadicOp {
    /// Sum of terms.
    Sum,
    /// Product of factors.
    Product,
}

impl VariadicOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Sum => "+",
            Self::Product => "*",
        }
    }
}

/// Reduction operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum ReduceOp {
    Sum,
    Product,
    Max,
    Min,
    All,
    Any,
}

/// Memory scope of a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum MemoryScope {
    /// Global device / host heap memory.
    #[default]
    Heap,
    /// Stack memory of the enclosing function.
    Stack,
    /// Memory shared by every thread of a block.
    GpuShared,
    /// Per-thread private memory.
    GpuLocal,
}

impl MemoryScope {
    /// Scopes that exist only for the lifetime of one kernel launch.
    pub const fn is_gpu_temp(self) -> bool {
        matches!(self, Self::GpuShared | Self::GpuLocal)
    }
}

/// One of the three dimensions of a device grid or block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::EnumIter)]
pub enum AxisDim {
    X,
    Y,
    Z,
}

impl AxisDim {
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            2 => Some(Self::Z),
            _ => None,
        }
    }
}

/// Device execution axis a loop iterator can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceAxis {
    /// Grid dimension (`blockIdx.*`).
    Block(AxisDim),
    /// Intra-block dimension (`threadIdx.*`).
    Thread(AxisDim),
}

impl DeviceAxis {
    pub const fn dim(self) -> AxisDim {
        match self {
            Self::Block(d) | Self::Thread(d) => d,
        }
    }

    pub const fn is_block(self) -> bool {
        matches!(self, Self::Block(_))
    }

    pub const fn is_thread(self) -> bool {
        matches!(self, Self::Thread(_))
    }

    /// Canonical symbol name, e.g. `blockIdx.x`.
    pub fn name(self) -> String {
        match self {
            Self::Block(d) => format!("{BLOCK_IDX_PREFIX}.{}", d.suffix()),
            Self::Thread(d) => format!("{THREAD_IDX_PREFIX}.{}", d.suffix()),
        }
    }

    /// The axis-identity symbol that replaces a bound iterator.
    pub fn var(self) -> Var {
        Var::new(self.name(), DType::Int32)
    }

    pub fn expr(self) -> Expr {
        Expr::Var(self.var())
    }

    /// Parse a canonical symbol name back into an axis.
    pub fn from_name(name: &str) -> Option<Self> {
        let (prefix, suffix) = name.split_once('.')?;
        let dim = match suffix {
            "x" => AxisDim::X,
            "y" => AxisDim::Y,
            "z" => AxisDim::Z,
            _ => return None,
        };
        match prefix {
            BLOCK_IDX_PREFIX => Some(Self::Block(dim)),
            THREAD_IDX_PREFIX => Some(Self::Thread(dim)),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Loop kind. A loop bound to a device axis carries [`ForKind::Bound`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ForKind {
    #[default]
    Serial,
    Parallel,
    Vectorized {
        factor: usize,
    },
    Unrolled,
    Bound(DeviceAxis),
}

impl ForKind {
    pub const fn device_axis(self) -> Option<DeviceAxis> {
        match self {
            Self::Bound(axis) => Some(axis),
            _ => None,
        }
    }

    pub const fn is_bound(self) -> bool {
        matches!(self, Self::Bound(_))
    }
}

impl fmt::Display for ForKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => f.write_str("serial"),
            Self::Parallel => f.write_str("parallel"),
            Self::Vectorized { factor } => write!(f, "vectorized({factor})"),
            Self::Unrolled => f.write_str("unrolled"),
            Self::Bound(axis) => write!(f, "bound({axis})"),
        }
    }
}

/// Kind of callee of a [`Call`](crate::expr::Call).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// External function resolved at link time.
    #[default]
    Extern,
    /// Backend intrinsic (barriers, math builtins).
    Intrinsic,
}

/// Direction of a lowered function argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    Input,
    Output,
}
