//! Tree visualization for expression trees.
//!
//! Provides pretty-printing of statement nests as ASCII trees, one node per
//! line, used by the lowering passes for debug dumps.

use std::borrow::Cow;
use std::io;

use ptree::{Style, TreeItem};

use super::*;

/// Borrowing wrapper that renders a subtree through `ptree`.
#[derive(Clone)]
pub struct ExprTree<'a> {
    expr: &'a Expr,
}

impl<'a> ExprTree<'a> {
    pub fn new(expr: &'a Expr) -> Self {
        Self { expr }
    }
}

impl TreeItem for ExprTree<'_> {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        write!(f, "{}", format_node(self.expr))
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Owned(self.expr.children().into_iter().map(ExprTree::new).collect())
    }
}

/// Format a single node without its children.
///
/// Output format: `KIND detail`
fn format_node(expr: &Expr) -> String {
    let detail = match expr {
        Expr::Const(c) => format!("{} : {}", c.value, c.dtype),
        Expr::Unary(op, _) => op.as_ref().to_string(),
        Expr::Binary(op, ..) => op.as_ref().to_string(),
        Expr::Variadic(op, operands) => format!("{}(n={})", op.as_ref(), operands.len()),
        Expr::Var(v) if v.is_reduce_axis() => format!("'{}' reduce", v.name),
        Expr::Var(v) => format!("'{}' : {}", v.name, v.dtype),
        Expr::Cast(c) => format!("-> {}", c.dtype),
        Expr::Ramp(r) => format!("lanes={}", r.lanes),
        Expr::Broadcast(b) => format!("lanes={}", b.lanes),
        Expr::For(f) => format!("'{}' {}", f.loop_var.name, f.kind),
        Expr::PolyFor(p) => format!("'{}' {}", p.iterator.name, p.kind),
        Expr::Call(c) => format!("'{}'", c.name),
        Expr::Alloc(a) => format!("'{}'", a.buffer.name),
        Expr::Free(fr) => format!("'{}'", fr.buffer.name),
        Expr::Reduce(r) => r.op.as_ref().to_string(),
        Expr::Module(m) => format!("'{}'", m.name),
        Expr::LoweredFunc(func) => format!("'{}' {}", func.name, func.launch),
        Expr::Tensor(t) => format!("'{}'", t.name),
        Expr::Buffer(b) => format!("'{}'", b.name),
        Expr::Select(_)
        | Expr::Load(_)
        | Expr::Store(_)
        | Expr::IfThenElse(_)
        | Expr::Block(_)
        | Expr::Let(_) => String::new(),
    };

    if detail.is_empty() { expr.kind_name().to_string() } else { format!("{} {}", expr.kind_name(), detail) }
}

/// Render an expression as an ASCII tree into `out`.
pub fn write_tree<W: io::Write>(expr: &Expr, out: W) -> io::Result<()> {
    ptree::write_tree(&ExprTree::new(expr), out)
}

impl Expr {
    /// ASCII tree of this subtree, for debug logging.
    pub fn tree(&self) -> String {
        let mut buf = Vec::new();
        match write_tree(self, &mut buf) {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(err) => format!("<tree rendering failed: {err}>"),
        }
    }
}
