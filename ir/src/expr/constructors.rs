//! Expr constructor methods.
//!
//! Free-standing builders used by the lowering front (out of this crate) and
//! by tests. Operand order always matches the traversal order of the node.

use std::ops;

use loom_dtype::DType;

use super::*;

impl Expr {
    // =========================================================================
    // Immediates
    // =========================================================================

    pub fn int(value: i64) -> Self {
        Self::Const(Const { value: ConstValue::Int(value), dtype: DType::Int32 })
    }

    pub fn int_typed(value: i64, dtype: DType) -> Self {
        Self::Const(Const { value: ConstValue::Int(value), dtype })
    }

    pub fn uint(value: u64) -> Self {
        Self::Const(Const { value: ConstValue::UInt(value), dtype: DType::UInt32 })
    }

    pub fn float(value: f64) -> Self {
        Self::Const(Const { value: ConstValue::Float(value), dtype: DType::Float32 })
    }

    pub fn bool_(value: bool) -> Self {
        Self::Const(Const { value: ConstValue::Bool(value), dtype: DType::Bool })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Const(Const { value: ConstValue::Str(value.into()), dtype: DType::String })
    }

    pub fn zero() -> Self {
        Self::int(0)
    }

    // =========================================================================
    // Symbols and arithmetic
    // =========================================================================

    /// Index variable of type `int32`.
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(Var::new(name, DType::Int32))
    }

    pub fn unary(op: UnaryOp, a: Expr) -> Self {
        Self::Unary(op, Box::new(a))
    }

    pub fn binary(op: BinaryOp, a: Expr, b: Expr) -> Self {
        Self::Binary(op, Box::new(a), Box::new(b))
    }

    pub fn neg(a: Expr) -> Self {
        Self::unary(UnaryOp::Neg, a)
    }

    pub fn not(a: Expr) -> Self {
        Self::unary(UnaryOp::Not, a)
    }

    pub fn div(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Div, a, b)
    }

    pub fn modulo(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Mod, a, b)
    }

    pub fn min(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Min, a, b)
    }

    pub fn max(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Max, a, b)
    }

    pub fn lt(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Lt, a, b)
    }

    pub fn le(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Le, a, b)
    }

    pub fn equal(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Eq, a, b)
    }

    pub fn and(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::And, a, b)
    }

    pub fn sum(terms: Vec<Expr>) -> Self {
        Self::Variadic(VariadicOp::Sum, terms)
    }

    pub fn product(factors: Vec<Expr>) -> Self {
        Self::Variadic(VariadicOp::Product, factors)
    }

    pub fn cast(value: Expr, dtype: DType) -> Self {
        Self::Cast(Cast { value: Box::new(value), dtype })
    }

    pub fn select(condition: Expr, true_value: Expr, false_value: Expr) -> Self {
        Self::Select(Select {
            condition: Box::new(condition),
            true_value: Box::new(true_value),
            false_value: Box::new(false_value),
        })
    }

    pub fn ramp(base: Expr, stride: Expr, lanes: usize) -> Self {
        Self::Ramp(Ramp { base: Box::new(base), stride: Box::new(stride), lanes })
    }

    pub fn broadcast(value: Expr, lanes: usize) -> Self {
        Self::Broadcast(Broadcast { value: Box::new(value), lanes })
    }

    // =========================================================================
    // Memory
    // =========================================================================

    pub fn tensor_ref(name: impl Into<String>) -> Self {
        Self::Tensor(TensorRef { name: name.into() })
    }

    pub fn buffer_ref(name: impl Into<String>) -> Self {
        Self::Buffer(BufferRef { name: name.into() })
    }

    /// `tensor[indices...]` where `tensor` names a tensor record.
    pub fn load(tensor: impl Into<String>, indices: Vec<Expr>) -> Self {
        Self::Load(Load { tensor: Box::new(Self::tensor_ref(tensor)), indices })
    }

    /// `buffer[indices...]` addressing a raw buffer.
    pub fn load_buffer(buffer: impl Into<String>, indices: Vec<Expr>) -> Self {
        Self::Load(Load { tensor: Box::new(Self::buffer_ref(buffer)), indices })
    }

    pub fn store(tensor: impl Into<String>, value: Expr, indices: Vec<Expr>) -> Self {
        Self::Store(Store { tensor: Box::new(Self::tensor_ref(tensor)), value: Box::new(value), indices })
    }

    pub fn store_buffer(buffer: impl Into<String>, value: Expr, indices: Vec<Expr>) -> Self {
        Self::Store(Store { tensor: Box::new(Self::buffer_ref(buffer)), value: Box::new(value), indices })
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Serial loop `for (name, min, extent) body`.
    pub fn for_(name: impl Into<String>, min: Expr, extent: Expr, body: Expr) -> Self {
        Self::for_kind(name, min, extent, ForKind::Serial, body)
    }

    pub fn for_kind(name: impl Into<String>, min: Expr, extent: Expr, kind: ForKind, body: Expr) -> Self {
        Self::For(For {
            loop_var: Var::new(name, DType::Int32),
            min: Box::new(min),
            extent: Box::new(extent),
            body: Box::new(body),
            kind,
        })
    }

    pub fn poly_for(name: impl Into<String>, init: Expr, condition: Expr, inc: Expr, body: Expr) -> Self {
        Self::PolyFor(PolyFor {
            iterator: Var::new(name, DType::Int32),
            init: Box::new(init),
            condition: Box::new(condition),
            inc: Box::new(inc),
            body: Box::new(body),
            kind: ForKind::Serial,
        })
    }

    pub fn if_then_else(condition: Expr, true_case: Expr, false_case: Option<Expr>) -> Self {
        Self::IfThenElse(IfThenElse {
            condition: Box::new(condition),
            true_case: Box::new(true_case),
            false_case: false_case.map(Box::new),
        })
    }

    pub fn block(stmts: Vec<Expr>) -> Self {
        Self::Block(stmts)
    }

    pub fn call(name: impl Into<String>, kind: CallKind, read_args: Vec<Expr>, write_args: Vec<Expr>) -> Self {
        Self::Call(Call { name: name.into(), kind, dtype: DType::Void, read_args, write_args })
    }

    /// Cross-thread barrier intrinsic.
    pub fn sync_threads() -> Self {
        Self::call(SYNC_THREADS, CallKind::Intrinsic, Vec::new(), Vec::new())
    }

    pub fn alloc(buffer: impl Into<String>, extents: Vec<Expr>, body: Option<Expr>) -> Self {
        Self::Alloc(Alloc {
            buffer: BufferRef { name: buffer.into() },
            extents,
            condition: None,
            body: body.map(Box::new),
        })
    }

    pub fn free(buffer: impl Into<String>) -> Self {
        Self::Free(Free { buffer: BufferRef { name: buffer.into() } })
    }

    pub fn let_(symbol: Expr, body: Option<Expr>) -> Self {
        Self::Let(Let { symbol: Box::new(symbol), body: body.map(Box::new) })
    }

    pub fn reduce(op: ReduceOp, init: Expr, body: Expr) -> Self {
        Self::Reduce(Reduce { op, init: Box::new(init), body: Box::new(body) })
    }

    pub fn lowered_func(name: impl Into<String>, args: Vec<Argument>, body: Expr) -> Self {
        Self::LoweredFunc(LoweredFunc { name: name.into(), args, body: Box::new(body), launch: LaunchDims::default() })
    }

    pub fn module(name: impl Into<String>, functions: Vec<Expr>) -> Self {
        Self::Module(Module { name: name.into(), functions, buffers: Vec::new(), submodules: Vec::new() })
    }
}

impl ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Add, self, rhs)
    }
}

impl ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Sub, self, rhs)
    }
}

impl ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Mul, self, rhs)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::int(value)
    }
}

impl From<Var> for Expr {
    fn from(var: Var) -> Self {
        Expr::Var(var)
    }
}
