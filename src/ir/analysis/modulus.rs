use super::scope::Scope;
use crate::ir::{BinOp, Expr, Ramp};

/// The fact `expr ≡ remainder (mod modulus)` for every runtime value.
///
/// `modulus == 0` means the expression is exactly `remainder`.
/// `modulus == 1` carries no information. Otherwise
/// `0 <= remainder < modulus`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModulusRemainder {
    pub modulus: i64,
    pub remainder: i64,
}

impl ModulusRemainder {
    pub const UNKNOWN: Self = Self {
        modulus: 1,
        remainder: 0,
    };

    pub fn constant(value: i64) -> Self {
        Self {
            modulus: 0,
            remainder: value,
        }
    }

    pub fn new(modulus: i64, remainder: i64) -> Self {
        let modulus = modulus.checked_abs().unwrap_or(1);
        if modulus == 0 {
            return Self::constant(remainder);
        }
        Self {
            modulus,
            remainder: remainder.rem_euclid(modulus),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.modulus == 0
    }

    pub fn is_unknown(&self) -> bool {
        self.modulus == 1
    }

    pub fn add(self, other: Self) -> Self {
        match self.remainder.checked_add(other.remainder) {
            Some(r) => Self::new(gcd(self.modulus, other.modulus), r),
            None => Self::UNKNOWN,
        }
    }

    pub fn sub(self, other: Self) -> Self {
        match self.remainder.checked_sub(other.remainder) {
            Some(r) => Self::new(gcd(self.modulus, other.modulus), r),
            None => Self::UNKNOWN,
        }
    }

    /// `(ma*k + ra)(mb*j + rb) = ma*mb*kj + ma*rb*k + mb*ra*j + ra*rb`.
    pub fn mul(self, other: Self) -> Self {
        let terms = (
            self.modulus.checked_mul(other.modulus),
            self.modulus.checked_mul(other.remainder),
            other.modulus.checked_mul(self.remainder),
            self.remainder.checked_mul(other.remainder),
        );
        match terms {
            (Some(mm), Some(mr), Some(rm), Some(rr)) => Self::new(gcd(gcd(mm, mr), rm), rr),
            _ => Self::UNKNOWN,
        }
    }

    /// Strongest fact true of a value that is either `self` or `other`.
    pub fn unify(self, other: Self) -> Self {
        match self.remainder.checked_sub(other.remainder) {
            Some(diff) => Self::new(
                gcd(gcd(self.modulus, other.modulus), diff),
                self.remainder,
            ),
            None => Self::UNKNOWN,
        }
    }

    fn div_by(self, c: i64) -> Self {
        if c <= 0 {
            return Self::UNKNOWN;
        }
        if self.is_constant() {
            return Self::constant(self.remainder.div_euclid(c));
        }
        if self.modulus % c == 0 {
            return Self::new(self.modulus / c, self.remainder.div_euclid(c));
        }
        Self::UNKNOWN
    }

    fn mod_by(self, c: i64) -> Self {
        if c <= 0 {
            return Self::UNKNOWN;
        }
        if self.is_constant() {
            return Self::constant(self.remainder.rem_euclid(c));
        }
        Self::new(gcd(self.modulus, c), self.remainder)
    }
}

pub(crate) fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    i64::try_from(a).unwrap_or(1)
}

/// Compute the strongest congruence for a scalar integer expression,
/// with variable facts taken from `scope`.
pub fn modulus_remainder(expr: &Expr, scope: &Scope<ModulusRemainder>) -> ModulusRemainder {
    Analyzer {
        outer: scope,
        local: Scope::new(),
    }
    .visit(expr)
}

/// `Some(expr mod modulus)` when that residue is statically known.
pub fn reduce_expr_modulo(
    expr: &Expr,
    modulus: i64,
    scope: &Scope<ModulusRemainder>,
) -> Option<i64> {
    if modulus <= 0 {
        return None;
    }
    let mr = modulus_remainder(expr, scope);
    if mr.modulus % modulus == 0 {
        Some(mr.remainder.rem_euclid(modulus))
    } else {
        None
    }
}

/// Lane offset of a ramp's first element from the previous multiple of
/// `alignment_lanes`, if statically known. Result is in `[0, alignment_lanes)`.
pub fn offset_from_alignment(
    ramp: &Ramp,
    alignment_lanes: i64,
    scope: &Scope<ModulusRemainder>,
) -> Option<i64> {
    reduce_expr_modulo(&ramp.base, alignment_lanes, scope)
}

/// Lets inside the analysed expression are bound in `local`, which is
/// consulted before the caller's scope.
struct Analyzer<'a> {
    outer: &'a Scope<ModulusRemainder>,
    local: Scope<ModulusRemainder>,
}

impl Analyzer<'_> {
    fn lookup(&self, name: &str) -> ModulusRemainder {
        self.local
            .get(name)
            .or_else(|| self.outer.get(name))
            .copied()
            .unwrap_or(ModulusRemainder::UNKNOWN)
    }

    fn visit(&mut self, expr: &Expr) -> ModulusRemainder {
        let ty = expr.ty();
        if !ty.is_scalar() || !ty.is_integral() {
            return ModulusRemainder::UNKNOWN;
        }
        match expr {
            Expr::IntImm { value, .. } => ModulusRemainder::constant(*value),
            Expr::Variable { name, .. } => self.lookup(name),
            Expr::Binary { op, a, b } => {
                let (fa, fb) = (self.visit(a), self.visit(b));
                match op {
                    BinOp::Add => fa.add(fb),
                    BinOp::Sub => fa.sub(fb),
                    BinOp::Mul => fa.mul(fb),
                    BinOp::Div if fb.is_constant() => fa.div_by(fb.remainder),
                    BinOp::Mod if fb.is_constant() => fa.mod_by(fb.remainder),
                    BinOp::Min | BinOp::Max => fa.unify(fb),
                    _ => ModulusRemainder::UNKNOWN,
                }
            }
            Expr::Let { name, value, body } => {
                let fact = self.visit(value);
                self.local.push(name, fact);
                let result = self.visit(body);
                self.local.pop(name);
                result
            }
            Expr::Cast { .. }
            | Expr::Broadcast { .. }
            | Expr::Ramp(_)
            | Expr::Load(_)
            | Expr::Call(_) => ModulusRemainder::UNKNOWN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(e: &Expr) -> ModulusRemainder {
        modulus_remainder(e, &Scope::new())
    }

    #[test]
    fn test_constant_is_exact() {
        assert_eq!(analyze(&Expr::int(37)), ModulusRemainder::constant(37));
        assert_eq!(
            reduce_expr_modulo(&Expr::int(37), 16, &Scope::new()),
            Some(5)
        );
        assert_eq!(
            reduce_expr_modulo(&Expr::int(-3), 16, &Scope::new()),
            Some(13)
        );
    }

    #[test]
    fn test_unbound_variable_is_unknown() {
        let mr = analyze(&(Expr::var("x") + 3));
        assert!(mr.is_unknown());
        assert_eq!(reduce_expr_modulo(&(Expr::var("x") + 3), 16, &Scope::new()), None);
    }

    #[test]
    fn test_scaled_variable_plus_offset() {
        // x*64 + 19 ≡ 3 (mod 16)
        let e = Expr::var("x") * 64 + 19;
        assert_eq!(analyze(&e), ModulusRemainder::new(64, 19));
        assert_eq!(reduce_expr_modulo(&e, 16, &Scope::new()), Some(3));
        assert_eq!(reduce_expr_modulo(&e, 128, &Scope::new()), None);
    }

    #[test]
    fn test_scope_facts_are_used() {
        let mut scope = Scope::new();
        scope.push("t", ModulusRemainder::new(32, 8));
        let e = Expr::var("t") * 2 - 1;
        assert_eq!(modulus_remainder(&e, &scope), ModulusRemainder::new(64, 15));
    }

    #[test]
    fn test_product_of_two_facts() {
        let mut scope = Scope::new();
        scope.push("a", ModulusRemainder::new(4, 1));
        scope.push("b", ModulusRemainder::new(6, 3));
        // (4k+1)(6j+3) = 24kj + 12k + 6j + 3 ≡ 3 (mod 6)
        let e = Expr::var("a") * Expr::var("b");
        assert_eq!(modulus_remainder(&e, &scope), ModulusRemainder::new(6, 3));
    }

    #[test]
    fn test_div_and_mod_by_constant() {
        let e = (Expr::var("x") * 32 + 8) / 4;
        assert_eq!(analyze(&e), ModulusRemainder::new(8, 2));
        let e = (Expr::var("x") * 32 + 8) / 3;
        assert!(analyze(&e).is_unknown());
        let e = (Expr::var("x") * 12 + 5) % 8;
        assert_eq!(analyze(&e), ModulusRemainder::new(4, 1));
        assert_eq!(analyze(&(Expr::int(-7) % 4)), ModulusRemainder::constant(1));
    }

    #[test]
    fn test_min_max_unify() {
        let a = Expr::var("x") * 16 + 4;
        let b = Expr::var("y") * 8 + 12;
        assert_eq!(analyze(&Expr::min(a, b)), ModulusRemainder::new(8, 4));
        let same = Expr::max(Expr::int(5), Expr::int(5));
        assert_eq!(analyze(&same), ModulusRemainder::constant(5));
    }

    #[test]
    fn test_let_binding_inside_expression() {
        let e = Expr::let_in("t", Expr::var("x") * 16, Expr::var("t") + 2);
        assert_eq!(analyze(&e), ModulusRemainder::new(16, 2));
    }

    #[test]
    fn test_overflow_degrades_to_unknown() {
        let e = Expr::int(i64::MAX) + Expr::int(1);
        assert!(analyze(&e).is_unknown());
    }

    #[test]
    fn test_vectors_and_loads_are_unknown() {
        let ramp = Expr::ramp(Expr::int(0), Expr::int(1), 4);
        assert!(analyze(&ramp).is_unknown());
        let load = Expr::load(crate::ir::Type::int(32), "buf", Expr::int(0));
        assert!(analyze(&load).is_unknown());
    }

    #[test]
    fn test_offset_from_alignment() {
        let ramp = Ramp {
            base: Box::new(Expr::var("x") * 32 + 35),
            stride: Box::new(Expr::int(1)),
            lanes: 16,
        };
        assert_eq!(offset_from_alignment(&ramp, 16, &Scope::new()), Some(3));
        assert_eq!(offset_from_alignment(&ramp, 64, &Scope::new()), None);
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(0, 12), 12);
        assert_eq!(gcd(-18, 12), 6);
        assert_eq!(gcd(0, 0), 0);
    }
}
