//! Textual rendering of expressions and statements.
//!
//! Expressions print inline (`A[(x + 1), y]`); statements print one per line
//! with two-space indentation per nesting level.

use std::fmt::{self, Write};

use super::*;

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer { out: f, indent: 0 }.print(self)
    }
}

struct Printer<'a, W: Write> {
    out: &'a mut W,
    indent: usize,
}

fn join<W: Write>(p: &mut Printer<'_, W>, items: &[Expr], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            p.out.write_str(sep)?;
        }
        p.print(item)?;
    }
    Ok(())
}

impl<W: Write> Printer<'_, W> {
    fn pad(&mut self) -> fmt::Result {
        for _ in 0..self.indent {
            self.out.write_str("  ")?;
        }
        Ok(())
    }

    /// Print a statement body enclosed in braces.
    fn print_scope(&mut self, body: &Expr) -> fmt::Result {
        self.out.write_str("{\n")?;
        self.indent += 1;
        match body {
            Expr::Block(stmts) => {
                for stmt in stmts {
                    self.print_stmt(stmt)?;
                }
            }
            other => self.print_stmt(other)?,
        }
        self.indent -= 1;
        self.pad()?;
        self.out.write_str("}")
    }

    fn print_stmt(&mut self, stmt: &Expr) -> fmt::Result {
        self.pad()?;
        self.print(stmt)?;
        self.out.write_str("\n")
    }

    fn print(&mut self, expr: &Expr) -> fmt::Result {
        match expr {
            Expr::Const(c) => write!(self.out, "{}", c.value),
            Expr::Unary(op, a) => {
                self.out.write_str(op.symbol())?;
                self.print(a)
            }
            Expr::Binary(op, a, b) if op.is_call_style() => {
                write!(self.out, "{}(", op.symbol())?;
                self.print(a)?;
                self.out.write_str(", ")?;
                self.print(b)?;
                self.out.write_str(")")
            }
            Expr::Binary(op, a, b) => {
                self.out.write_str("(")?;
                self.print(a)?;
                write!(self.out, " {} ", op.symbol())?;
                self.print(b)?;
                self.out.write_str(")")
            }
            Expr::Variadic(op, operands) => {
                self.out.write_str("(")?;
                join(self, operands, &format!(" {} ", op.symbol()))?;
                self.out.write_str(")")
            }
            Expr::Var(v) => self.out.write_str(&v.name),
            Expr::Cast(c) => {
                write!(self.out, "{}(", c.dtype)?;
                self.print(&c.value)?;
                self.out.write_str(")")
            }
            Expr::Select(s) => {
                self.out.write_str("select(")?;
                self.print(&s.condition)?;
                self.out.write_str(", ")?;
                self.print(&s.true_value)?;
                self.out.write_str(", ")?;
                self.print(&s.false_value)?;
                self.out.write_str(")")
            }
            Expr::Ramp(r) => {
                self.out.write_str("ramp(")?;
                self.print(&r.base)?;
                self.out.write_str(", ")?;
                self.print(&r.stride)?;
                write!(self.out, ", {})", r.lanes)
            }
            Expr::Broadcast(b) => {
                self.out.write_str("broadcast(")?;
                self.print(&b.value)?;
                write!(self.out, ", {})", b.lanes)
            }
            Expr::Load(l) => {
                self.print(&l.tensor)?;
                self.out.write_str("[")?;
                join(self, &l.indices, ", ")?;
                self.out.write_str("]")
            }
            Expr::Store(s) => {
                self.print(&s.tensor)?;
                self.out.write_str("[")?;
                join(self, &s.indices, ", ")?;
                self.out.write_str("] = ")?;
                self.print(&s.value)
            }
            Expr::For(fl) => {
                write!(self.out, "for ({}, ", fl.loop_var.name)?;
                self.print(&fl.min)?;
                self.out.write_str(", ")?;
                self.print(&fl.extent)?;
                self.out.write_str(")")?;
                if fl.kind != ForKind::Serial {
                    write!(self.out, " [{}]", fl.kind)?;
                }
                self.out.write_str(" ")?;
                self.print_scope(&fl.body)
            }
            Expr::PolyFor(p) => {
                write!(self.out, "poly_for ({}, ", p.iterator.name)?;
                self.print(&p.init)?;
                self.out.write_str(", ")?;
                self.print(&p.condition)?;
                self.out.write_str(", ")?;
                self.print(&p.inc)?;
                self.out.write_str(") ")?;
                self.print_scope(&p.body)
            }
            Expr::IfThenElse(i) => {
                self.out.write_str("if (")?;
                self.print(&i.condition)?;
                self.out.write_str(") ")?;
                self.print_scope(&i.true_case)?;
                if let Some(false_case) = &i.false_case {
                    self.out.write_str(" else ")?;
                    self.print_scope(false_case)?;
                }
                Ok(())
            }
            Expr::Block(stmts) => {
                if stmts.is_empty() {
                    return self.out.write_str("{}");
                }
                self.print_scope(expr)
            }
            Expr::Call(c) => {
                write!(self.out, "{}(", c.name)?;
                join(self, &c.read_args, ", ")?;
                if !c.write_args.is_empty() {
                    self.out.write_str("; ")?;
                    join(self, &c.write_args, ", ")?;
                }
                self.out.write_str(")")
            }
            Expr::Alloc(a) => {
                write!(self.out, "alloc {}[", a.buffer.name)?;
                join(self, &a.extents, ", ")?;
                self.out.write_str("]")?;
                if let Some(cond) = &a.condition {
                    self.out.write_str(" if ")?;
                    self.print(cond)?;
                }
                if let Some(body) = &a.body {
                    self.out.write_str(" ")?;
                    self.print_scope(body)?;
                }
                Ok(())
            }
            Expr::Free(fr) => write!(self.out, "free {}", fr.buffer.name),
            Expr::Let(l) => {
                self.out.write_str("let ")?;
                self.print(&l.symbol)?;
                if let Some(body) = &l.body {
                    self.out.write_str(" = ")?;
                    self.print(body)?;
                }
                Ok(())
            }
            Expr::Reduce(r) => {
                write!(self.out, "reduce_{}(", r.op.as_ref().to_lowercase())?;
                self.print(&r.init)?;
                self.out.write_str(", ")?;
                self.print(&r.body)?;
                self.out.write_str(")")
            }
            Expr::Module(m) => {
                writeln!(self.out, "module {} {{", m.name)?;
                self.indent += 1;
                for func in &m.functions {
                    self.print_stmt(func)?;
                }
                self.indent -= 1;
                self.pad()?;
                self.out.write_str("}")
            }
            Expr::LoweredFunc(func) => {
                write!(self.out, "function {}(", func.name)?;
                for (i, arg) in func.args.iter().enumerate() {
                    if i > 0 {
                        self.out.write_str(", ")?;
                    }
                    self.out.write_str(&arg.name)?;
                }
                self.out.write_str(")")?;
                if func.launch.valid {
                    write!(self.out, " {}", func.launch)?;
                }
                self.out.write_str(" ")?;
                self.print_scope(&func.body)
            }
            Expr::Tensor(t) => self.out.write_str(&t.name),
            Expr::Buffer(b) => self.out.write_str(&b.name),
        }
    }
}
