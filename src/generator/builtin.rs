//! Generators shipped with the compiler.

use super::{Generator, GeneratorParams, GeneratorRegistry, Pipeline};
use crate::config::target::Target;
use crate::diagnostic::Diagnostic;
use crate::ir::simplify::simplify;
use crate::ir::{Call, CallType, Expr, Parameter, Stmt, Type};
use crate::span::Span;

/// Register every built-in generator with `registry`.
pub fn register_builtin_generators(registry: &GeneratorRegistry) -> Result<(), Diagnostic> {
    registry.register_factory(
        HostAlignment::NAME,
        Box::new(|| -> Box<dyn Generator> { Box::new(HostAlignment::new()) }),
    )?;
    registry.register_factory(
        Deinterleave::NAME,
        Box::new(|| -> Box<dyn Generator> { Box::new(Deinterleave::new()) }),
    )?;
    registry.register_factory(
        InterleaveRgb::NAME,
        Box::new(|| -> Box<dyn Generator> { Box::new(InterleaveRgb::new()) }),
    )?;
    Ok(())
}

/// `lanes` is either an integer or `natural` for the target's width.
fn lanes_param(params: &GeneratorParams, ty: Type, target: &Target) -> Result<i64, Diagnostic> {
    let lanes = match params.get("lanes") {
        Some("natural") => target.natural_vector_size(ty),
        _ => params.get_int("lanes")?,
    };
    if lanes < 1 || lanes > i64::from(u16::MAX) {
        return Err(Diagnostic::error(
            format!("param 'lanes' must be between 1 and {}, got {}", u16::MAX, lanes),
            Span::dummy(),
        ));
    }
    Ok(lanes)
}

fn extent_param(params: &GeneratorParams) -> Result<i64, Diagnostic> {
    let extent = params.get_int("extent")?;
    if extent < 0 {
        return Err(Diagnostic::error(
            format!("param 'extent' must not be negative, got {}", extent),
            Span::dummy(),
        ));
    }
    Ok(extent)
}

fn dense(base: Expr, lanes: i64) -> Expr {
    strided(base, 1, lanes)
}

fn strided(base: Expr, stride: i64, lanes: i64) -> Expr {
    Expr::ramp(simplify(&base), Expr::int(stride), lanes as u32)
}

// ─── host_alignment ────────────────────────────────────────────────

/// `f0(x) = i1(x + offset) + i2(x + offset) + i3(x + offset)` over int8,
/// with `i1` declared 128-byte aligned, `i2` 32-byte aligned, `i3`
/// undeclared and the output 128-byte aligned.
pub struct HostAlignment {
    params: GeneratorParams,
}

impl HostAlignment {
    pub const NAME: &'static str = "host_alignment";

    pub fn new() -> Self {
        Self {
            params: GeneratorParams::new(&[("lanes", "natural"), ("extent", "4"), ("offset", "0")]),
        }
    }
}

impl Default for HostAlignment {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for HostAlignment {
    fn params(&self) -> &GeneratorParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut GeneratorParams {
        &mut self.params
    }

    fn build(&self, target: &Target) -> Result<Pipeline, Diagnostic> {
        let elem = Type::int(8);
        let lanes = lanes_param(&self.params, elem, target)?;
        let extent = extent_param(&self.params)?;
        let offset = self.params.get_int("offset")?;
        let ty = elem.with_lanes(lanes as u32);

        let i1 = Parameter::buffer("i1", elem).with_host_alignment(128);
        let i2 = Parameter::buffer("i2", elem).with_host_alignment(32);
        let i3 = Parameter::buffer("i3", elem);
        let f0 = Parameter::buffer("f0", elem).with_host_alignment(128);

        let base = Expr::var("x") * lanes;
        let read = |p: &Parameter| Expr::load_param(ty, p, dense(base.clone() + offset, lanes));
        let sum = read(&i1) + read(&i2) + read(&i3);
        let body = Stmt::serial_for(
            "x",
            Expr::int(0),
            Expr::int(extent),
            Stmt::store_param(&f0, sum, dense(base.clone(), lanes)),
        );
        Ok(Pipeline::new(Self::NAME, vec![i1, i2, i3, f0], body))
    }
}

// ─── deinterleave ──────────────────────────────────────────────────

/// Split `input` into its even and odd elements. `alignment` is the
/// declared host alignment of `input` in bytes, 0 for none.
pub struct Deinterleave {
    params: GeneratorParams,
}

impl Deinterleave {
    pub const NAME: &'static str = "deinterleave";

    pub fn new() -> Self {
        Self {
            params: GeneratorParams::new(&[
                ("type", "uint8"),
                ("lanes", "natural"),
                ("extent", "4"),
                ("alignment", "0"),
            ]),
        }
    }
}

impl Default for Deinterleave {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for Deinterleave {
    fn params(&self) -> &GeneratorParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut GeneratorParams {
        &mut self.params
    }

    fn build(&self, target: &Target) -> Result<Pipeline, Diagnostic> {
        let elem = self.params.get_type("type")?;
        let lanes = lanes_param(&self.params, elem, target)?;
        let extent = extent_param(&self.params)?;
        let alignment = self.params.get_int("alignment")?;
        let alignment = u32::try_from(alignment).map_err(|_| {
            Diagnostic::error(
                format!("param 'alignment' out of range: {}", alignment),
                Span::dummy(),
            )
        })?;
        let ty = elem.with_lanes(lanes as u32);

        let mut input = Parameter::buffer("input", elem);
        if alignment > 0 {
            input.set_host_alignment(alignment);
        }
        let even = Parameter::buffer("even", elem);
        let odd = Parameter::buffer("odd", elem);

        let x = Expr::var("x");
        let src = x.clone() * (2 * lanes);
        let dst = dense(x * lanes, lanes);
        let body = Stmt::serial_for(
            "x",
            Expr::int(0),
            Expr::int(extent),
            Stmt::block(vec![
                Stmt::store_param(
                    &even,
                    Expr::load_param(ty, &input, strided(src.clone(), 2, lanes)),
                    dst.clone(),
                ),
                Stmt::store_param(
                    &odd,
                    Expr::load_param(ty, &input, strided(src + 1, 2, lanes)),
                    dst,
                ),
            ]),
        );
        Ok(Pipeline::new(Self::NAME, vec![input, even, odd], body))
    }
}

// ─── interleave_rgb ────────────────────────────────────────────────

/// Copy three planar channels into an internal buffer, then store them
/// interleaved as `r g b r g b ...`.
pub struct InterleaveRgb {
    params: GeneratorParams,
}

impl InterleaveRgb {
    pub const NAME: &'static str = "interleave_rgb";

    pub fn new() -> Self {
        Self {
            params: GeneratorParams::new(&[("type", "uint8"), ("lanes", "natural"), ("extent", "4")]),
        }
    }
}

impl Default for InterleaveRgb {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for InterleaveRgb {
    fn params(&self) -> &GeneratorParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut GeneratorParams {
        &mut self.params
    }

    fn build(&self, target: &Target) -> Result<Pipeline, Diagnostic> {
        let elem = self.params.get_type("type")?;
        let lanes = lanes_param(&self.params, elem, target)?;
        let extent = extent_param(&self.params)?;
        let ty = elem.with_lanes(lanes as u32);
        // Elements per channel.
        let plane = extent * lanes;

        let input = Parameter::buffer("input", elem);
        let rgb = Parameter::buffer("rgb", elem);

        let x = Expr::var("x");
        let copy = Stmt::serial_for(
            "x",
            Expr::int(0),
            Expr::int(extent),
            Stmt::block(
                (0..3)
                    .map(|c| {
                        let at = dense(x.clone() * lanes + c * plane, lanes);
                        Stmt::store("planar", Expr::load_param(ty, &input, at.clone()), at)
                    })
                    .collect(),
            ),
        );

        let channels: Vec<Expr> = (0..3)
            .map(|c| Expr::load(ty, "planar", dense(x.clone() * lanes + c * plane, lanes)))
            .collect();
        let wide = elem.with_lanes(3 * lanes as u32);
        let concat = Expr::call(wide, Call::CONCAT_VECTORS, channels, CallType::PureIntrinsic);
        let mut args = vec![concat];
        args.extend((0..lanes).flat_map(|i| (0..3).map(move |c| Expr::int(c * lanes + i))));
        let interleaved = Expr::call(wide, Call::SHUFFLE_VECTOR, args, CallType::PureIntrinsic);
        let store = Stmt::serial_for(
            "x",
            Expr::int(0),
            Expr::int(extent),
            Stmt::store_param(&rgb, interleaved, dense(x * (3 * lanes), 3 * lanes)),
        );

        let body = Stmt::allocate(
            "planar",
            elem,
            Expr::int(3 * plane),
            Stmt::block(vec![copy, store]),
        );
        Ok(Pipeline::new(Self::NAME, vec![input, rgb], body))
    }
}
