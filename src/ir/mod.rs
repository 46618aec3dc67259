//! Lowered pipeline IR consumed by the middle-end passes.
//!
//! Expressions and statements are closed sums over node kinds. Trees are
//! immutable values: a pass consumes a tree by reference and builds a new
//! one, so adding a node kind is a compile-time-checked match arm in every
//! pass rather than a visitor override.

pub mod align;
pub mod analysis;
pub mod eval;
pub mod print;
pub mod simplify;
pub mod types;

pub use types::{Type, TypeCode};

// ─── Collaborator handles ──────────────────────────────────────────

/// A buffer argument of a pipeline.
///
/// It may declare the byte alignment of its host pointer. When none is
/// declared the only guarantee is natural element alignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    ty: Type,
    host_alignment: Option<u32>,
}

impl Parameter {
    pub fn buffer(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            host_alignment: None,
        }
    }

    pub fn with_host_alignment(mut self, bytes: u32) -> Self {
        self.set_host_alignment(bytes);
        self
    }

    pub fn set_host_alignment(&mut self, bytes: u32) {
        self.host_alignment = Some(bytes);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Declared alignment, if the user set one.
    pub fn declared_host_alignment(&self) -> Option<u32> {
        self.host_alignment
    }

    /// Host pointer alignment in bytes; element size when undeclared.
    pub fn host_alignment(&self) -> i64 {
        match self.host_alignment {
            Some(bytes) => bytes as i64,
            None => self.ty.bytes(),
        }
    }

    /// Name of the variable holding this buffer's host pointer.
    pub fn host_var(&self) -> String {
        format!("{}.host", self.name)
    }
}

/// An image statically attached to the pipeline. Its storage is owned
/// outside the compiler, so nothing is known about its placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buffer {
    pub name: String,
    pub ty: Type,
    pub dimensions: u32,
}

// ─── Expressions ───────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    Eq,
    Lt,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Lt)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallType {
    Extern,
    PureExtern,
    Intrinsic,
    PureIntrinsic,
}

/// `lanes` values `base, base + stride, base + 2*stride, ...`.
#[derive(Clone, Debug, PartialEq)]
pub struct Ramp {
    pub base: Box<Expr>,
    pub stride: Box<Expr>,
    pub lanes: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Load {
    pub ty: Type,
    pub name: String,
    pub index: Box<Expr>,
    /// Set when reading a statically attached image.
    pub image: Option<Buffer>,
    /// Set when reading through a pipeline buffer parameter.
    pub param: Option<Parameter>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub ty: Type,
    pub name: String,
    pub args: Vec<Expr>,
    pub call_type: CallType,
}

impl Call {
    /// Concatenate equal-typed vectors end to end.
    pub const CONCAT_VECTORS: &'static str = "concat_vectors";
    /// `shuffle_vector(vec, i0, i1, ...)` selects lanes of `vec`.
    pub const SHUFFLE_VECTOR: &'static str = "shuffle_vector";

    pub fn is_intrinsic(&self, name: &str) -> bool {
        matches!(
            self.call_type,
            CallType::Intrinsic | CallType::PureIntrinsic
        ) && self.name == name
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    IntImm {
        ty: Type,
        value: i64,
    },
    Variable {
        ty: Type,
        name: String,
    },
    Cast {
        ty: Type,
        value: Box<Expr>,
    },
    Binary {
        op: BinOp,
        a: Box<Expr>,
        b: Box<Expr>,
    },
    Broadcast {
        value: Box<Expr>,
        lanes: u32,
    },
    Ramp(Ramp),
    Load(Load),
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    Call(Call),
}

impl Expr {
    /// 32-bit integer literal.
    pub fn int(value: i64) -> Self {
        Expr::IntImm {
            ty: Type::int(32),
            value,
        }
    }

    pub fn imm(ty: Type, value: i64) -> Self {
        Expr::IntImm {
            ty,
            value: ty.wrap(value),
        }
    }

    /// 32-bit integer variable.
    pub fn var(name: impl Into<String>) -> Self {
        Self::typed_var(Type::int(32), name)
    }

    pub fn typed_var(ty: Type, name: impl Into<String>) -> Self {
        Expr::Variable {
            ty,
            name: name.into(),
        }
    }

    pub fn cast(ty: Type, value: Expr) -> Self {
        Expr::Cast {
            ty,
            value: Box::new(value),
        }
    }

    pub fn binary(op: BinOp, a: Expr, b: Expr) -> Self {
        Expr::Binary {
            op,
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    pub fn min(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Min, a, b)
    }

    pub fn max(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Max, a, b)
    }

    pub fn cmp_eq(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Eq, a, b)
    }

    pub fn cmp_lt(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Lt, a, b)
    }

    pub fn broadcast(value: Expr, lanes: u32) -> Self {
        Expr::Broadcast {
            value: Box::new(value),
            lanes,
        }
    }

    pub fn ramp(base: Expr, stride: Expr, lanes: u32) -> Self {
        Expr::Ramp(Ramp {
            base: Box::new(base),
            stride: Box::new(stride),
            lanes,
        })
    }

    /// Load from an internal (compiler-allocated) buffer.
    pub fn load(ty: Type, name: impl Into<String>, index: Expr) -> Self {
        Expr::Load(Load {
            ty,
            name: name.into(),
            index: Box::new(index),
            image: None,
            param: None,
        })
    }

    /// Load through a buffer parameter; the buffer name is the param's.
    pub fn load_param(ty: Type, param: &Parameter, index: Expr) -> Self {
        Expr::Load(Load {
            ty,
            name: param.name().to_string(),
            index: Box::new(index),
            image: None,
            param: Some(param.clone()),
        })
    }

    /// Load from a statically attached image.
    pub fn load_image(ty: Type, image: &Buffer, index: Expr) -> Self {
        Expr::Load(Load {
            ty,
            name: image.name.clone(),
            index: Box::new(index),
            image: Some(image.clone()),
            param: None,
        })
    }

    pub fn let_in(name: impl Into<String>, value: Expr, body: Expr) -> Self {
        Expr::Let {
            name: name.into(),
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    pub fn call(ty: Type, name: impl Into<String>, args: Vec<Expr>, call_type: CallType) -> Self {
        Expr::Call(Call {
            ty,
            name: name.into(),
            args,
            call_type,
        })
    }

    pub fn ty(&self) -> Type {
        match self {
            Expr::IntImm { ty, .. } | Expr::Variable { ty, .. } | Expr::Cast { ty, .. } => *ty,
            Expr::Binary { op, a, .. } => {
                let t = a.ty();
                if op.is_comparison() {
                    Type::bool().with_lanes(t.lanes)
                } else {
                    t
                }
            }
            Expr::Broadcast { value, lanes } => value.ty().with_lanes(*lanes),
            Expr::Ramp(r) => r.base.ty().with_lanes(r.lanes),
            Expr::Load(l) => l.ty,
            Expr::Let { body, .. } => body.ty(),
            Expr::Call(c) => c.ty,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Expr::IntImm { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_ramp(&self) -> Option<&Ramp> {
        match self {
            Expr::Ramp(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Expr::Call(c) => Some(c),
            _ => None,
        }
    }

    /// Literal of this expression's element type, broadcast to its lanes.
    fn matching_imm(&self, value: i64) -> Expr {
        let t = self.ty();
        let imm = Expr::imm(t.element_of(), value);
        if t.is_vector() {
            Expr::broadcast(imm, t.lanes)
        } else {
            imm
        }
    }
}

macro_rules! impl_arith {
    ($trait:ident, $method:ident, $op:expr) => {
        impl std::ops::$trait<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, self, rhs)
            }
        }

        impl std::ops::$trait<i64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: i64) -> Expr {
                let rhs = self.matching_imm(rhs);
                Expr::binary($op, self, rhs)
            }
        }
    };
}

impl_arith!(Add, add, BinOp::Add);
impl_arith!(Sub, sub, BinOp::Sub);
impl_arith!(Mul, mul, BinOp::Mul);
impl_arith!(Div, div, BinOp::Div);
impl_arith!(Rem, rem, BinOp::Mod);

// ─── Statements ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ForType {
    Serial,
    Parallel,
    Vectorized,
    Unrolled,
}

/// Where a loop body executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceApi {
    Host,
    /// Fixed-width vector coprocessor; its width comes from the target's
    /// HVX mode.
    Hexagon,
    Gpu,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    LetStmt {
        name: String,
        value: Expr,
        body: Box<Stmt>,
    },
    AssertStmt {
        condition: Expr,
        message: Expr,
    },
    For {
        name: String,
        min: Expr,
        extent: Expr,
        for_type: ForType,
        device_api: DeviceApi,
        body: Box<Stmt>,
    },
    Store {
        name: String,
        value: Expr,
        index: Expr,
        param: Option<Parameter>,
    },
    /// A compiler-owned buffer of `extent` elements, live for `body`.
    Allocate {
        name: String,
        ty: Type,
        extent: Expr,
        body: Box<Stmt>,
    },
    Block(Vec<Stmt>),
    IfThenElse {
        condition: Expr,
        then_case: Box<Stmt>,
        else_case: Option<Box<Stmt>>,
    },
    Evaluate(Expr),
}

impl Stmt {
    pub fn let_stmt(name: impl Into<String>, value: Expr, body: Stmt) -> Self {
        Stmt::LetStmt {
            name: name.into(),
            value,
            body: Box::new(body),
        }
    }

    pub fn serial_for(name: impl Into<String>, min: Expr, extent: Expr, body: Stmt) -> Self {
        Stmt::For {
            name: name.into(),
            min,
            extent,
            for_type: ForType::Serial,
            device_api: DeviceApi::Host,
            body: Box::new(body),
        }
    }

    /// Same loop, offloaded to `device_api`.
    pub fn on_device(self, device: DeviceApi) -> Self {
        match self {
            Stmt::For {
                name,
                min,
                extent,
                for_type,
                body,
                ..
            } => Stmt::For {
                name,
                min,
                extent,
                for_type,
                device_api: device,
                body,
            },
            other => other,
        }
    }

    pub fn store(name: impl Into<String>, value: Expr, index: Expr) -> Self {
        Stmt::Store {
            name: name.into(),
            value,
            index,
            param: None,
        }
    }

    pub fn store_param(param: &Parameter, value: Expr, index: Expr) -> Self {
        Stmt::Store {
            name: param.name().to_string(),
            value,
            index,
            param: Some(param.clone()),
        }
    }

    pub fn allocate(name: impl Into<String>, ty: Type, extent: Expr, body: Stmt) -> Self {
        Stmt::Allocate {
            name: name.into(),
            ty,
            extent,
            body: Box::new(body),
        }
    }

    /// Flatten nested blocks; a single statement is returned as is.
    pub fn block(stmts: Vec<Stmt>) -> Self {
        let mut flat = Vec::with_capacity(stmts.len());
        for s in stmts {
            match s {
                Stmt::Block(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(Stmt::Block(Vec::new()))
        } else {
            Stmt::Block(flat)
        }
    }
}
