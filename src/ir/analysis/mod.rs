//! Static facts about IR expressions.

pub mod modulus;
pub mod scope;

pub use modulus::{modulus_remainder, offset_from_alignment, reduce_expr_modulo, ModulusRemainder};
pub use scope::Scope;
