//! Textual form of the IR, used for `.stmt` artifacts and trace output.

use std::fmt::{self, Display, Formatter, Write};

use super::{BinOp, DeviceApi, Expr, ForType, Stmt, TypeCode};

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::IntImm { ty, value } => {
                if ty.code == TypeCode::Int && ty.bits == 32 {
                    write!(f, "{}", value)
                } else {
                    write!(f, "({}){}", ty, value)
                }
            }
            Expr::Variable { name, .. } => write!(f, "{}", name),
            Expr::Cast { ty, value } => write!(f, "{}({})", ty, value),
            Expr::Binary { op, a, b } => match op {
                BinOp::Min => write!(f, "min({}, {})", a, b),
                BinOp::Max => write!(f, "max({}, {})", a, b),
                _ => write!(f, "({} {} {})", a, op_symbol(*op), b),
            },
            Expr::Broadcast { value, lanes } => write!(f, "x{}({})", lanes, value),
            Expr::Ramp(r) => write!(f, "ramp({}, {}, {})", r.base, r.stride, r.lanes),
            Expr::Load(l) => write!(f, "{}[{}]", l.name, l.index),
            Expr::Let { name, value, body } => {
                write!(f, "(let {} = {} in {})", name, value, body)
            }
            Expr::Call(c) => {
                write!(f, "{}(", c.name)?;
                for (i, arg) in c.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_char(')')
            }
        }
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::Lt => "<",
        BinOp::Min => "min",
        BinOp::Max => "max",
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        print_stmt(f, self, 0)
    }
}

fn indent(f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("  ")?;
    }
    Ok(())
}

fn print_stmt(f: &mut Formatter<'_>, stmt: &Stmt, depth: usize) -> fmt::Result {
    match stmt {
        Stmt::LetStmt { name, value, body } => {
            indent(f, depth)?;
            writeln!(f, "let {} = {}", name, value)?;
            print_stmt(f, body, depth)
        }
        Stmt::AssertStmt { condition, message } => {
            indent(f, depth)?;
            writeln!(f, "assert({}, {})", condition, message)
        }
        Stmt::For {
            name,
            min,
            extent,
            for_type,
            device_api,
            body,
        } => {
            indent(f, depth)?;
            let keyword = match for_type {
                ForType::Serial => "for",
                ForType::Parallel => "parallel",
                ForType::Vectorized => "vectorized",
                ForType::Unrolled => "unrolled",
            };
            f.write_str(keyword)?;
            match device_api {
                DeviceApi::Host => {}
                DeviceApi::Hexagon => f.write_str("<Hexagon>")?,
                DeviceApi::Gpu => f.write_str("<GPU>")?,
            }
            writeln!(f, " ({}, {}, {}) {{", name, min, extent)?;
            print_stmt(f, body, depth + 1)?;
            indent(f, depth)?;
            writeln!(f, "}}")
        }
        Stmt::Store {
            name, value, index, ..
        } => {
            indent(f, depth)?;
            writeln!(f, "{}[{}] = {}", name, index, value)
        }
        Stmt::Allocate {
            name,
            ty,
            extent,
            body,
        } => {
            indent(f, depth)?;
            writeln!(f, "allocate {}[{} * {}] {{", name, ty, extent)?;
            print_stmt(f, body, depth + 1)?;
            indent(f, depth)?;
            writeln!(f, "}}")
        }
        Stmt::Block(stmts) => {
            for s in stmts {
                print_stmt(f, s, depth)?;
            }
            Ok(())
        }
        Stmt::IfThenElse {
            condition,
            then_case,
            else_case,
        } => {
            indent(f, depth)?;
            writeln!(f, "if ({}) {{", condition)?;
            print_stmt(f, then_case, depth + 1)?;
            if let Some(else_case) = else_case {
                indent(f, depth)?;
                writeln!(f, "}} else {{")?;
                print_stmt(f, else_case, depth + 1)?;
            }
            indent(f, depth)?;
            writeln!(f, "}}")
        }
        Stmt::Evaluate(e) => {
            indent(f, depth)?;
            writeln!(f, "{}", e)
        }
    }
}
