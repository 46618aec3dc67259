//! pixir: the vector-load alignment pass of an image-pipeline compiler,
//! with the generators and driver that feed it.

pub mod api;
pub mod config;
pub mod diagnostic;
pub mod generator;
pub mod ir;
pub mod span;

// Re-exports: keep `pixir::target` and `pixir::align_loads` short
pub use config::target;
pub use ir::align::{align_loads, align_loads_with_report, AlignReport};

pub use api::*;
