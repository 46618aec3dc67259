/// Vector load alignment.
///
/// Rewrites vector loads whose address is not provably aligned to the
/// native vector width into aligned loads plus lane shuffles. Loads that
/// are narrower or wider than a native vector are first resized to native
/// width. Anything the congruence analysis cannot prove is left alone.
use std::fmt;

use tracing::{debug, trace};

use super::analysis::{modulus_remainder, offset_from_alignment, ModulusRemainder, Scope};
use super::simplify::simplify;
use super::{Call, CallType, Expr, Load, Ramp, Stmt, Type};
use crate::config::target::Target;
use crate::diagnostic::Diagnostic;


/// How many loads each rule rewrote or declined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlignReport {
    /// Dense loads at a known non-zero offset, split into two aligned loads.
    pub unaligned: usize,
    /// Loads narrower than a native vector, widened then shuffled down.
    pub narrowed: usize,
    /// Loads wider than a native vector, split into native chunks.
    pub split: usize,
    /// Stride-2 loads turned into two dense loads and an interleave.
    pub deinterleaved: usize,
    /// Of `deinterleaved`, those whose second load was shifted back one
    /// element to stay inside an external buffer.
    pub shifted: usize,
    /// Vector loads left unchanged.
    pub unchanged: usize,
}

impl AlignReport {
    pub fn rewrites(&self) -> usize {
        self.unaligned + self.narrowed + self.split + self.deinterleaved
    }
}

impl fmt::Display for AlignReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "unaligned: {}", self.unaligned)?;
        writeln!(f, "narrowed: {}", self.narrowed)?;
        writeln!(f, "split: {}", self.split)?;
        writeln!(f, "deinterleaved: {} ({} shifted)", self.deinterleaved, self.shifted)?;
        writeln!(f, "unchanged: {}", self.unchanged)
    }
}

/// Align the vector loads in `stmt` for `target`.
pub fn align_loads(stmt: &Stmt, target: &Target) -> Result<Stmt, Diagnostic> {
    align_loads_with_report(stmt, target).map(|(s, _)| s)
}

pub fn align_loads_with_report(
    stmt: &Stmt,
    target: &Target,
) -> Result<(Stmt, AlignReport), Diagnostic> {
    let mut pass = AlignLoads {
        target,
        alignment_info: Scope::new(),
        report: AlignReport::default(),
    };
    let required_alignment = target.natural_vector_size(Type::int(8));
    let out = pass.mutate_stmt(stmt, required_alignment)?;
    debug_assert!(pass.alignment_info.is_empty());
    Ok((out, pass.report))
}

/// `shuffle_vector(concat_vectors(a, b), indices...)`.
///
/// Lanes are numbered across the concatenation; the result has one lane
/// per index.
pub fn concat_and_shuffle(a: Expr, b: Expr, indices: impl IntoIterator<Item = i64>) -> Expr {
    let t = a.ty();
    let doubled = Expr::call(
        t.with_lanes(t.lanes * 2),
        Call::CONCAT_VECTORS,
        vec![a, b],
        CallType::PureIntrinsic,
    );
    let mut args = vec![doubled];
    args.extend(indices.into_iter().map(Expr::int));
    let lanes = (args.len() - 1) as u32;
    Expr::call(
        t.with_lanes(lanes),
        Call::SHUFFLE_VECTOR,
        args,
        CallType::PureIntrinsic,
    )
}

/// The required alignment (bytes) is threaded through every call by
/// value, so a coprocessor loop's override ends with its body.
struct AlignLoads<'t> {
    target: &'t Target,
    /// Congruence facts for int32 let-bound names currently in scope.
    alignment_info: Scope<ModulusRemainder>,
    report: AlignReport,
}

impl AlignLoads<'_> {
    fn natural_vector_lanes(ty: Type, required_alignment: i64) -> i64 {
        required_alignment / ty.bytes()
    }

    /// Lane offset of `ramp`'s base from alignment, if known.
    ///
    /// A base pointer aligned to less than the requirement makes the
    /// index congruence meaningless, so that case is unknown.
    fn alignment_offset(
        &self,
        ramp: &Ramp,
        base_alignment: i64,
        ty: Type,
        required_alignment: i64,
    ) -> Option<i64> {
        if base_alignment % required_alignment != 0 {
            return None;
        }
        let lanes = Self::natural_vector_lanes(ty, required_alignment);
        offset_from_alignment(ramp, lanes, &self.alignment_info)
    }

    /// Run `f` with `name`'s congruence in scope when `value` is an int32
    /// scalar. The fact is popped whatever `f` returns.
    fn with_binding<R>(&mut self, name: &str, value: &Expr, f: impl FnOnce(&mut Self) -> R) -> R {
        if value.ty() != Type::int(32) {
            return f(self);
        }
        let fact = modulus_remainder(value, &self.alignment_info);
        self.alignment_info.push(name, fact);
        let result = f(self);
        self.alignment_info.pop(name);
        result
    }

    fn mutate_expr(&mut self, expr: &Expr, required_alignment: i64) -> Expr {
        let mut m = |e: &Expr| self.mutate_expr(e, required_alignment);
        match expr {
            Expr::IntImm { .. } | Expr::Variable { .. } => expr.clone(),
            Expr::Cast { ty, value } => Expr::cast(*ty, m(value)),
            Expr::Binary { op, a, b } => {
                let a = m(a);
                Expr::binary(*op, a, m(b))
            }
            Expr::Broadcast { value, lanes } => Expr::broadcast(m(value), *lanes),
            Expr::Ramp(r) => {
                let base = m(&r.base);
                Expr::ramp(base, m(&r.stride), r.lanes)
            }
            Expr::Load(op) => self.visit_load(op, required_alignment),
            Expr::Let { name, value, body } => {
                let value = m(value);
                let body = self.with_binding(name, &value, |pass| {
                    pass.mutate_expr(body, required_alignment)
                });
                Expr::let_in(name.clone(), value, body)
            }
            Expr::Call(c) => Expr::Call(Call {
                args: c.args.iter().map(m).collect(),
                ..c.clone()
            }),
        }
    }

    fn visit_load(&mut self, op: &Load, required_alignment: i64) -> Expr {
        let index = self.mutate_expr(&op.index, required_alignment);
        let load = Load {
            index: Box::new(index),
            ..op.clone()
        };
        if !op.ty.is_vector() {
            return Expr::Load(load);
        }
        trace!("align_loads: working on {}", Expr::Load(load.clone()));

        if load.image.is_some() {
            trace!("align_loads: not dealing with an external image");
            return self.unchanged(load);
        }
        let Some(ramp) = load.index.as_ramp() else {
            trace!("align_loads: index is not a ramp");
            return self.unchanged(load);
        };
        let Some(stride) = ramp.stride.as_int() else {
            trace!("align_loads: stride is not a constant");
            return self.unchanged(load);
        };
        if !matches!(stride.abs(), 1 | 2) {
            return self.unchanged(load);
        }
        let native_lanes = Self::natural_vector_lanes(op.ty, required_alignment);
        let Ok(native) = u32::try_from(native_lanes) else {
            trace!("align_loads: {} native lanes do not fit a vector type", native_lanes);
            return self.unchanged(load);
        };
        if native < 1 {
            return self.unchanged(load);
        }
        let ramp = ramp.clone();

        if ramp.lanes < native {
            self.narrow(&load, &ramp, stride, native, required_alignment)
        } else if ramp.lanes > native {
            self.split(&load, &ramp, stride, native_lanes, required_alignment)
        } else if stride == 1 {
            self.dense(load, &ramp, required_alignment)
        } else if stride == 2 {
            self.deinterleave(&load, &ramp, required_alignment)
        } else {
            self.unchanged(load)
        }
    }

    fn unchanged(&mut self, load: Load) -> Expr {
        self.report.unchanged += 1;
        Expr::Load(load)
    }

    /// Load a whole native vector at the same base and stride, then keep
    /// its first `lanes` lanes.
    fn narrow(
        &mut self,
        load: &Load,
        ramp: &Ramp,
        stride: i64,
        native_lanes: u32,
        required_alignment: i64,
    ) -> Expr {
        self.report.narrowed += 1;
        let wide = Expr::Load(Load {
            ty: load.ty.with_lanes(native_lanes),
            index: Box::new(Expr::ramp((*ramp.base).clone(), Expr::int(stride), native_lanes)),
            ..load.clone()
        });
        let vec = self.mutate_expr(&wide, required_alignment);
        let mut args = vec![vec];
        args.extend((0..ramp.lanes as i64).map(Expr::int));
        debug!("align_loads: narrowed {}-lane load of {}", ramp.lanes, load.name);
        Expr::call(load.ty, Call::SHUFFLE_VECTOR, args, CallType::PureIntrinsic)
    }

    /// Chunks of native width (the last one may be short), concatenated.
    fn split(
        &mut self,
        load: &Load,
        ramp: &Ramp,
        stride: i64,
        native_lanes: i64,
        required_alignment: i64,
    ) -> Expr {
        self.report.split += 1;
        let total = ramp.lanes as i64;
        let slices = (0..total)
            .step_by(native_lanes as usize)
            .map(|i| {
                let slice_lanes = native_lanes.min(total - i) as u32;
                let slice_base = simplify(&((*ramp.base).clone() + i * stride));
                Expr::Load(Load {
                    ty: load.ty.with_lanes(slice_lanes),
                    index: Box::new(Expr::ramp(slice_base, Expr::int(stride), slice_lanes)),
                    ..load.clone()
                })
            })
            .collect::<Vec<_>>();
        debug!(
            "align_loads: split {}-lane load of {} into {} slices",
            total,
            load.name,
            slices.len()
        );
        let concat = Expr::call(
            load.ty,
            Call::CONCAT_VECTORS,
            slices,
            CallType::PureIntrinsic,
        );
        self.mutate_expr(&concat, required_alignment)
    }

    /// Native-width, stride-1 load.
    fn dense(&mut self, load: Load, ramp: &Ramp, required_alignment: i64) -> Expr {
        // Parameters carry their declared host alignment. Internal buffers
        // are allocated at the natural vector width.
        let base_alignment = load
            .param
            .as_ref()
            .map_or(required_alignment, |p| p.host_alignment());
        let offset = self.alignment_offset(ramp, base_alignment, load.ty, required_alignment);
        let lanes_off = match offset {
            Some(k) if k != 0 => k,
            _ => {
                trace!(
                    "align_loads: unknown alignment or aligned load: {} index {}",
                    load.ty,
                    load.index
                );
                return self.unchanged(load);
            }
        };

        self.report.unaligned += 1;
        let lanes = ramp.lanes;
        let base_low = simplify(&((*ramp.base).clone() - lanes_off));
        let base_high = simplify(&(base_low.clone() + lanes as i64));
        let at = |base: Expr| {
            Expr::Load(Load {
                index: Box::new(Expr::ramp(base, Expr::int(1), lanes)),
                ..load.clone()
            })
        };
        let out = concat_and_shuffle(at(base_low), at(base_high), lanes_off..lanes_off + lanes as i64);
        debug!(
            "align_loads: unaligned load {}[{}] -> {}",
            load.name, load.index, out
        );
        out
    }

    /// Native-width, stride-2 load: two dense loads, then pick every other
    /// lane of their concatenation.
    fn deinterleave(&mut self, load: &Load, ramp: &Ramp, required_alignment: i64) -> Expr {
        self.report.deinterleaved += 1;
        let lanes = ramp.lanes as i64;

        // When the first element may not be aligned, the second dense load
        // could run one element past the end of an external buffer. Start
        // it one element earlier and compensate in the shuffle.
        let shift = match &load.param {
            Some(p) => !matches!(
                self.alignment_offset(ramp, p.host_alignment(), load.ty, required_alignment),
                Some(0)
            ),
            None => false,
        };
        let b_shift = shift as i64;
        if shift {
            self.report.shifted += 1;
            debug!("align_loads: base of {} may be unaligned, shifting second load", load.name);
        }

        let base_a = (*ramp.base).clone();
        let base_b = simplify(&((*ramp.base).clone() + (lanes - b_shift)));
        let dense = |base: Expr| {
            Expr::Load(Load {
                index: Box::new(Expr::ramp(base, Expr::int(1), ramp.lanes)),
                ..load.clone()
            })
        };
        let vec_a = self.mutate_expr(&dense(base_a), required_alignment);
        let vec_b = self.mutate_expr(&dense(base_b), required_alignment);

        let indices = (0..lanes).map(|i| {
            let j = 2 * i;
            if j >= lanes {
                j + b_shift
            } else {
                j
            }
        });
        let out = concat_and_shuffle(vec_a, vec_b, indices);
        debug!(
            "align_loads: strided load {}[{}] -> {}",
            load.name, load.index, out
        );
        out
    }

    fn mutate_stmt(&mut self, stmt: &Stmt, required_alignment: i64) -> Result<Stmt, Diagnostic> {
        Ok(match stmt {
            Stmt::LetStmt { name, value, body } => {
                let value = self.mutate_expr(value, required_alignment);
                let body = self.with_binding(name, &value, |pass| {
                    pass.mutate_stmt(body, required_alignment)
                })?;
                Stmt::let_stmt(name.clone(), value, body)
            }
            Stmt::AssertStmt { condition, message } => Stmt::AssertStmt {
                condition: self.mutate_expr(condition, required_alignment),
                message: self.mutate_expr(message, required_alignment),
            },
            Stmt::For {
                name,
                min,
                extent,
                for_type,
                device_api,
                body,
            } => {
                let inner_alignment = self
                    .target
                    .device_vector_bytes(*device_api)?
                    .unwrap_or(required_alignment);
                if inner_alignment != required_alignment {
                    debug!(
                        "align_loads: loop {} requires {}-byte alignment",
                        name, inner_alignment
                    );
                }
                Stmt::For {
                    name: name.clone(),
                    min: self.mutate_expr(min, inner_alignment),
                    extent: self.mutate_expr(extent, inner_alignment),
                    for_type: *for_type,
                    device_api: *device_api,
                    body: Box::new(self.mutate_stmt(body, inner_alignment)?),
                }
            }
            Stmt::Store {
                name,
                value,
                index,
                param,
            } => Stmt::Store {
                name: name.clone(),
                value: self.mutate_expr(value, required_alignment),
                index: self.mutate_expr(index, required_alignment),
                param: param.clone(),
            },
            Stmt::Allocate {
                name,
                ty,
                extent,
                body,
            } => Stmt::Allocate {
                name: name.clone(),
                ty: *ty,
                extent: self.mutate_expr(extent, required_alignment),
                body: Box::new(self.mutate_stmt(body, required_alignment)?),
            },
            Stmt::Block(stmts) => Stmt::Block(
                stmts
                    .iter()
                    .map(|s| self.mutate_stmt(s, required_alignment))
                    .collect::<Result<_, _>>()?,
            ),
            Stmt::IfThenElse {
                condition,
                then_case,
                else_case,
            } => Stmt::IfThenElse {
                condition: self.mutate_expr(condition, required_alignment),
                then_case: Box::new(self.mutate_stmt(then_case, required_alignment)?),
                else_case: match else_case {
                    Some(e) => Some(Box::new(self.mutate_stmt(e, required_alignment)?)),
                    None => None,
                },
            },
            Stmt::Evaluate(e) => Stmt::Evaluate(self.mutate_expr(e, required_alignment)),
        })
    }
}
