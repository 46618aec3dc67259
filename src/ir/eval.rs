//! Reference interpreter for integer IR.
//!
//! Used to check that rewritten trees compute the same lanes as the
//! originals. Every value is a vector of `i64` lanes, wrapped to the
//! width of its IR type. Float arithmetic is not modelled.

use std::collections::BTreeMap;

use super::analysis::Scope;
use super::{BinOp, Call, Expr, Stmt, Type};
use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Buffers and free scalar variables visible to a program.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Environment {
    pub buffers: BTreeMap<String, Vec<i64>>,
    pub scalars: BTreeMap<String, i64>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(mut self, name: &str, data: Vec<i64>) -> Self {
        self.buffers.insert(name.to_string(), data);
        self
    }

    pub fn with_scalar(mut self, name: &str, value: i64) -> Self {
        self.scalars.insert(name.to_string(), value);
        self
    }

    pub fn buffer(&self, name: &str) -> Option<&[i64]> {
        self.buffers.get(name).map(|v| v.as_slice())
    }
}

fn eval_error(message: String) -> Diagnostic {
    Diagnostic::error(message, Span::dummy())
}

/// Evaluate an expression against `env`.
pub fn evaluate(expr: &Expr, env: &Environment) -> Result<Vec<i64>, Diagnostic> {
    let mut machine = Machine::new(env.clone());
    machine.eval(expr)
}

/// Run a statement, mutating the buffers in `env`.
pub fn execute(stmt: &Stmt, env: &mut Environment) -> Result<(), Diagnostic> {
    let mut machine = Machine::new(std::mem::take(env));
    let result = machine.exec(stmt);
    *env = machine.env;
    result
}

struct Machine {
    env: Environment,
    vars: Scope<Vec<i64>>,
}

impl Machine {
    fn new(env: Environment) -> Self {
        let mut vars = Scope::new();
        for (name, value) in &env.scalars {
            vars.push(name, vec![*value]);
        }
        Self { env, vars }
    }

    fn scalar(&mut self, expr: &Expr) -> Result<i64, Diagnostic> {
        let v = self.eval(expr)?;
        match v.as_slice() {
            [x] => Ok(*x),
            _ => Err(eval_error(format!("expected a scalar, got {} lanes: {}", v.len(), expr))),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Vec<i64>, Diagnostic> {
        match expr {
            Expr::IntImm { ty, value } => Ok(vec![ty.wrap(*value)]),
            Expr::Variable { name, .. } => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| eval_error(format!("unbound variable '{}'", name))),
            Expr::Cast { ty, value } => {
                if !ty.is_integral() {
                    return Err(eval_error(format!("cannot evaluate cast to {}", ty)));
                }
                Ok(self.eval(value)?.into_iter().map(|x| ty.wrap(x)).collect())
            }
            Expr::Binary { op, a, b } => {
                let ty = expr.ty();
                let (va, vb) = (self.eval(a)?, self.eval(b)?);
                binary(*op, ty, &va, &vb)
            }
            Expr::Broadcast { value, lanes } => {
                let x = self.scalar(value)?;
                Ok(vec![x; *lanes as usize])
            }
            Expr::Ramp(r) => {
                let ty = r.base.ty();
                let base = self.scalar(&r.base)?;
                let stride = self.scalar(&r.stride)?;
                Ok((0..r.lanes as i64)
                    .map(|i| ty.wrap(base.wrapping_add(stride.wrapping_mul(i))))
                    .collect())
            }
            Expr::Load(l) => {
                let index = self.eval(&l.index)?;
                let data = self
                    .env
                    .buffers
                    .get(&l.name)
                    .ok_or_else(|| eval_error(format!("unknown buffer '{}'", l.name)))?;
                index
                    .iter()
                    .map(|&i| {
                        usize::try_from(i)
                            .ok()
                            .and_then(|i| data.get(i))
                            .map(|x| l.ty.wrap(*x))
                            .ok_or_else(|| {
                                eval_error(format!(
                                    "load from '{}' at index {} is out of bounds (size {})",
                                    l.name,
                                    i,
                                    data.len()
                                ))
                            })
                    })
                    .collect()
            }
            Expr::Let { name, value, body } => {
                let v = self.eval(value)?;
                self.vars.push(name, v);
                let result = self.eval(body);
                self.vars.pop(name);
                result
            }
            Expr::Call(c) => self.call(c),
        }
    }

    fn call(&mut self, c: &Call) -> Result<Vec<i64>, Diagnostic> {
        if c.is_intrinsic(Call::CONCAT_VECTORS) {
            let mut out = Vec::with_capacity(c.ty.lanes as usize);
            for arg in &c.args {
                out.extend(self.eval(arg)?);
            }
            return Ok(out);
        }
        if c.is_intrinsic(Call::SHUFFLE_VECTOR) {
            let (vec, indices) = c
                .args
                .split_first()
                .ok_or_else(|| eval_error("shuffle_vector without operands".to_string()))?;
            let vec = self.eval(vec)?;
            let mut out = Vec::with_capacity(indices.len());
            for idx in indices {
                let i = self.scalar(idx)?;
                let lane = usize::try_from(i).ok().and_then(|i| vec.get(i)).ok_or_else(|| {
                    eval_error(format!(
                        "shuffle index {} out of range for {} lanes",
                        i,
                        vec.len()
                    ))
                })?;
                out.push(*lane);
            }
            return Ok(out);
        }
        Err(eval_error(format!("cannot evaluate call to '{}'", c.name)))
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<(), Diagnostic> {
        match stmt {
            Stmt::LetStmt { name, value, body } => {
                let v = self.eval(value)?;
                self.vars.push(name, v);
                let result = self.exec(body);
                self.vars.pop(name);
                result
            }
            Stmt::AssertStmt { condition, message } => {
                let ok = self.eval(condition)?.iter().all(|&x| x != 0);
                if ok {
                    Ok(())
                } else {
                    Err(eval_error(format!("assertion failed: {}", message)))
                }
            }
            Stmt::For {
                name,
                min,
                extent,
                body,
                ..
            } => {
                let min = self.scalar(min)?;
                let extent = self.scalar(extent)?;
                for i in min..min.saturating_add(extent) {
                    self.vars.push(name, vec![i]);
                    let result = self.exec(body);
                    self.vars.pop(name);
                    result?;
                }
                Ok(())
            }
            Stmt::Store {
                name, value, index, ..
            } => {
                let ty = value.ty();
                let values = self.eval(value)?;
                let indices = self.eval(index)?;
                if values.len() != indices.len() {
                    return Err(eval_error(format!(
                        "store to '{}' writes {} lanes at {} indices",
                        name,
                        values.len(),
                        indices.len()
                    )));
                }
                let data = self
                    .env
                    .buffers
                    .get_mut(name)
                    .ok_or_else(|| eval_error(format!("unknown buffer '{}'", name)))?;
                let size = data.len();
                for (i, v) in indices.into_iter().zip(values) {
                    let slot = usize::try_from(i).ok().and_then(|i| data.get_mut(i)).ok_or_else(
                        || {
                            eval_error(format!(
                                "store to '{}' at index {} is out of bounds (size {})",
                                name, i, size
                            ))
                        },
                    )?;
                    *slot = ty.wrap(v);
                }
                Ok(())
            }
            Stmt::Allocate {
                name, extent, body, ..
            } => {
                let extent = self.scalar(extent)?.max(0) as usize;
                let shadowed = self.env.buffers.insert(name.clone(), vec![0; extent]);
                let result = self.exec(body);
                match shadowed {
                    Some(old) => self.env.buffers.insert(name.clone(), old),
                    None => self.env.buffers.remove(name),
                };
                result
            }
            Stmt::Block(stmts) => stmts.iter().try_for_each(|s| self.exec(s)),
            Stmt::IfThenElse {
                condition,
                then_case,
                else_case,
            } => {
                if self.scalar(condition)? != 0 {
                    self.exec(then_case)
                } else if let Some(else_case) = else_case {
                    self.exec(else_case)
                } else {
                    Ok(())
                }
            }
            Stmt::Evaluate(e) => self.eval(e).map(|_| ()),
        }
    }
}

fn binary(op: BinOp, ty: Type, a: &[i64], b: &[i64]) -> Result<Vec<i64>, Diagnostic> {
    if !ty.is_integral() {
        return Err(eval_error(format!("cannot evaluate {} arithmetic", ty)));
    }
    let lanes = a.len().max(b.len());
    let lane = |v: &[i64], i: usize| if v.len() == 1 { v[0] } else { v[i] };
    if (a.len() != lanes && a.len() != 1) || (b.len() != lanes && b.len() != 1) {
        return Err(eval_error(format!(
            "lane mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok((0..lanes)
        .map(|i| {
            let (x, y) = (lane(a, i), lane(b, i));
            let r = match op {
                BinOp::Add => x.wrapping_add(y),
                BinOp::Sub => x.wrapping_sub(y),
                BinOp::Mul => x.wrapping_mul(y),
                BinOp::Div if y == 0 => 0,
                BinOp::Div => x.wrapping_div_euclid(y),
                BinOp::Mod if y == 0 => 0,
                BinOp::Mod => x.wrapping_rem_euclid(y),
                BinOp::Min => x.min(y),
                BinOp::Max => x.max(y),
                BinOp::Eq => (x == y) as i64,
                BinOp::Lt => (x < y) as i64,
            };
            ty.wrap(r)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CallType, Parameter};

    fn bytes(n: i64) -> Vec<i64> {
        (0..n).map(|i| (i * 7 + 1) & 0xff).collect()
    }

    #[test]
    fn test_ramp_load() {
        let env = Environment::new().with_buffer("in", bytes(64));
        let p = Parameter::buffer("in", Type::uint(8));
        let e = Expr::load_param(
            Type::uint(8).with_lanes(4),
            &p,
            Expr::ramp(Expr::int(3), Expr::int(2), 4),
        );
        let expected: Vec<i64> = [3, 5, 7, 9].iter().map(|i| (i * 7 + 1) & 0xff).collect();
        assert_eq!(evaluate(&e, &env).unwrap(), expected);
    }

    #[test]
    fn test_out_of_bounds_load_is_an_error() {
        let env = Environment::new().with_buffer("in", bytes(4));
        let e = Expr::load(
            Type::uint(8).with_lanes(4),
            "in",
            Expr::ramp(Expr::int(2), Expr::int(1), 4),
        );
        let err = evaluate(&e, &env).unwrap_err();
        assert!(err.message.contains("out of bounds"), "{}", err.message);
    }

    #[test]
    fn test_shuffle_of_concat() {
        let a = Expr::ramp(Expr::int(0), Expr::int(1), 4);
        let b = Expr::ramp(Expr::int(10), Expr::int(1), 4);
        let cat = Expr::call(
            Type::int(32).with_lanes(8),
            Call::CONCAT_VECTORS,
            vec![a, b],
            CallType::PureIntrinsic,
        );
        let mut args = vec![cat];
        args.extend([1, 3, 5, 7].iter().map(|&i| Expr::int(i)));
        let shuf = Expr::call(
            Type::int(32).with_lanes(4),
            Call::SHUFFLE_VECTOR,
            args,
            CallType::PureIntrinsic,
        );
        assert_eq!(evaluate(&shuf, &Environment::new()).unwrap(), vec![1, 3, 11, 13]);
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let a = Expr::imm(Type::uint(8), 250);
        let e = a + 10;
        assert_eq!(evaluate(&e, &Environment::new()).unwrap(), vec![4]);
    }

    #[test]
    fn test_loop_store_and_allocate() {
        let body = Stmt::allocate(
            "tmp",
            Type::int(32),
            Expr::int(4),
            Stmt::block(vec![
                Stmt::serial_for(
                    "i",
                    Expr::int(0),
                    Expr::int(4),
                    Stmt::store("tmp", Expr::var("i") * 3, Expr::var("i")),
                ),
                Stmt::store(
                    "out",
                    Expr::load(
                        Type::int(32).with_lanes(4),
                        "tmp",
                        Expr::ramp(Expr::int(0), Expr::int(1), 4),
                    ),
                    Expr::ramp(Expr::int(0), Expr::int(1), 4),
                ),
            ]),
        );
        let mut env = Environment::new().with_buffer("out", vec![0; 4]);
        execute(&body, &mut env).unwrap();
        assert_eq!(env.buffer("out"), Some(&[0, 3, 6, 9][..]));
        assert!(env.buffer("tmp").is_none());
    }

    #[test]
    fn test_failed_assert_reports_message() {
        let s = Stmt::AssertStmt {
            condition: Expr::cmp_eq(Expr::var("in.host") % 16, Expr::int(0)),
            message: Expr::call(
                Type::int(32),
                "halide_error_unaligned_host_ptr",
                vec![],
                CallType::Extern,
            ),
        };
        let mut env = Environment::new().with_scalar("in.host", 4);
        let err = execute(&s, &mut env).unwrap_err();
        assert!(err.message.contains("halide_error_unaligned_host_ptr"));
        let mut env = Environment::new().with_scalar("in.host", 32);
        assert!(execute(&s, &mut env).is_ok());
    }
}
