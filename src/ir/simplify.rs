/// Constant folding and affine offset canonicalization.
///
/// Only what the load rewriter needs to keep rebuilt indices readable:
/// `(x + 3) - 3` becomes `x`, `(x - 5) + 16` becomes `x + 11`, and
/// literal arithmetic folds. Every rewrite preserves wrapping semantics.
use super::{BinOp, Call, Expr, Load, Ramp};

pub fn simplify(expr: &Expr) -> Expr {
    match expr {
        Expr::IntImm { .. } | Expr::Variable { .. } => expr.clone(),
        Expr::Cast { ty, value } => {
            let value = simplify(value);
            match value.as_int() {
                Some(v) if ty.is_integral() && ty.is_scalar() => Expr::imm(*ty, v),
                _ => Expr::cast(*ty, value),
            }
        }
        Expr::Binary { op, a, b } => simplify_binary(*op, simplify(a), simplify(b)),
        Expr::Broadcast { value, lanes } => Expr::broadcast(simplify(value), *lanes),
        Expr::Ramp(r) => Expr::Ramp(Ramp {
            base: Box::new(simplify(&r.base)),
            stride: Box::new(simplify(&r.stride)),
            lanes: r.lanes,
        }),
        Expr::Load(l) => Expr::Load(Load {
            index: Box::new(simplify(&l.index)),
            ..l.clone()
        }),
        Expr::Let { name, value, body } => {
            Expr::let_in(name.clone(), simplify(value), simplify(body))
        }
        Expr::Call(c) => Expr::Call(Call {
            args: c.args.iter().map(simplify).collect(),
            ..c.clone()
        }),
    }
}

fn simplify_binary(op: BinOp, a: Expr, b: Expr) -> Expr {
    let ty = a.ty();
    let foldable = ty.is_scalar() && ty.is_integral();
    if foldable {
        if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
            let folded = match op {
                BinOp::Add => Some(x.wrapping_add(y)),
                BinOp::Sub => Some(x.wrapping_sub(y)),
                BinOp::Mul => Some(x.wrapping_mul(y)),
                BinOp::Min => Some(x.min(y)),
                BinOp::Max => Some(x.max(y)),
                _ => None,
            };
            if let Some(v) = folded {
                return Expr::imm(ty, v);
            }
        }
        match op {
            BinOp::Add => {
                if let Some(c) = a.as_int() {
                    return offset(b, c);
                }
                if let Some(c) = b.as_int() {
                    return offset(a, c);
                }
            }
            BinOp::Sub => {
                if let Some(c) = b.as_int() {
                    return offset(a, c.wrapping_neg());
                }
            }
            BinOp::Mul if b.as_int() == Some(1) => return a,
            _ => {}
        }
    }
    Expr::binary(op, a, b)
}

/// `e + delta`, merged with any literal offset already on `e`.
fn offset(e: Expr, delta: i64) -> Expr {
    let ty = e.ty();
    let (rest, existing) = split_offset(e);
    let total = ty.wrap(existing.wrapping_add(delta));
    match rest {
        None => Expr::imm(ty, total),
        Some(rest) if total == 0 => rest,
        Some(rest) if total < 0 => Expr::binary(BinOp::Sub, rest, Expr::imm(ty, -total)),
        Some(rest) => Expr::binary(BinOp::Add, rest, Expr::imm(ty, total)),
    }
}

fn split_offset(e: Expr) -> (Option<Expr>, i64) {
    match e {
        Expr::IntImm { value, .. } => (None, value),
        Expr::Binary { op, a, b } => match (op, b.as_int()) {
            (BinOp::Add, Some(c)) => (Some(*a), c),
            (BinOp::Sub, Some(c)) => (Some(*a), c.wrapping_neg()),
            _ => (Some(Expr::Binary { op, a, b }), 0),
        },
        other => (Some(other), 0),
    }
}
