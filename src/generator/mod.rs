//! Named pipeline generators.
//!
//! A generator turns a set of string parameters and a target into a
//! [`Pipeline`]: its buffer arguments plus the lowered body that
//! the alignment pass rewrites. Generators are created through a
//! [`GeneratorRegistry`], usually the process-wide [`GeneratorRegistry::global`].

pub mod builtin;
pub mod emit;

use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::config::target::Target;
use crate::diagnostic::Diagnostic;
use crate::ir::{CallType, Expr, Parameter, Stmt, Type};
use crate::span::Span;

pub use builtin::register_builtin_generators;
pub use emit::{emit_filter, simple_name, EmitOptions};


/// Parameter values as given on the command line: `name -> value`.
pub type GeneratorParamValues = BTreeMap<String, String>;

/// Extern called when a host pointer fails its declared alignment.
pub const UNALIGNED_HOST_PTR_ERROR: &str = "halide_error_unaligned_host_ptr";

/// A C identifier that does not start with `_` and never has two
/// underscores in a row.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    let mut prev = ' ';
    for c in chars {
        if !(c.is_ascii_alphanumeric() || c == '_') {
            return false;
        }
        if c == '_' && prev == '_' {
            return false;
        }
        prev = c;
    }
    true
}

fn user_error(message: String) -> Diagnostic {
    Diagnostic::error(message, Span::dummy())
}

// ─── Parameters ────────────────────────────────────────────────────

/// The declared parameters of one generator, with their current values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorParams {
    values: GeneratorParamValues,
}

impl GeneratorParams {
    /// Declare parameters with their default values.
    pub fn new(defaults: &[(&str, &str)]) -> Self {
        let values = defaults
            .iter()
            .map(|(name, value)| {
                debug_assert!(is_valid_name(name), "invalid param name {}", name);
                (name.to_string(), value.to_string())
            })
            .collect();
        Self { values }
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<(), Diagnostic> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(())
            }
            None => Err(user_error(format!(
                "Generator has no GeneratorParam named: {}",
                name
            ))
            .with_help(format!(
                "known params: {}",
                self.values.keys().cloned().collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    pub fn set_all(&mut self, values: &GeneratorParamValues) -> Result<(), Diagnostic> {
        values.iter().try_for_each(|(k, v)| self.set(k, v))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn get_int(&self, name: &str) -> Result<i64, Diagnostic> {
        let raw = self.declared(name)?;
        raw.parse()
            .map_err(|_| user_error(format!("param '{}' expects an integer, got '{}'", name, raw)))
    }

    pub fn get_type(&self, name: &str) -> Result<Type, Diagnostic> {
        let raw = self.declared(name)?;
        Type::from_name(raw).ok_or_else(|| {
            user_error(format!("param '{}' has unknown type '{}'", name, raw)).with_help(format!(
                "expected one of: {}",
                Type::type_names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    fn declared(&self, name: &str) -> Result<&str, Diagnostic> {
        self.get(name)
            .ok_or_else(|| Diagnostic::internal(format!("undeclared GeneratorParam: {}", name)))
    }
}

// ─── Pipelines ─────────────────────────────────────────────────────

/// A lowered pipeline ready for the alignment pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Pipeline {
    pub name: String,
    pub arguments: Vec<Parameter>,
    pub body: Stmt,
}

impl Pipeline {
    /// Wrap `body` with the host-alignment checks for `arguments`.
    pub fn new(name: impl Into<String>, arguments: Vec<Parameter>, body: Stmt) -> Self {
        let mut stmts = host_alignment_asserts(&arguments);
        stmts.push(body);
        Self {
            name: name.into(),
            arguments,
            body: Stmt::block(stmts),
        }
    }
}

/// `assert((p.host % align) == 0, halide_error_unaligned_host_ptr(..))`
/// for every buffer argument with a declared host alignment.
pub fn host_alignment_asserts(arguments: &[Parameter]) -> Vec<Stmt> {
    arguments
        .iter()
        .filter_map(|p| {
            let align = i64::from(p.declared_host_alignment()?);
            let host = Expr::var(p.host_var());
            Some(Stmt::AssertStmt {
                condition: Expr::cmp_eq(host.clone() % align, Expr::int(0)),
                message: Expr::call(
                    Type::int(32),
                    UNALIGNED_HOST_PTR_ERROR,
                    vec![host, Expr::int(align)],
                    CallType::Extern,
                ),
            })
        })
        .collect()
}

// ─── Generators ────────────────────────────────────────────────────

pub trait Generator {
    fn params(&self) -> &GeneratorParams;

    fn params_mut(&mut self) -> &mut GeneratorParams;

    /// Build the lowered pipeline for `target`.
    fn build(&self, target: &Target) -> Result<Pipeline, Diagnostic>;

    /// Set one param; unknown names are rejected.
    fn set_param(&mut self, name: &str, value: &str) -> Result<(), Diagnostic> {
        self.params_mut().set(name, value)
    }
}

pub trait GeneratorFactory: Send + Sync {
    fn create(&self, params: &GeneratorParamValues) -> Result<Box<dyn Generator>, Diagnostic>;
}

impl<F> GeneratorFactory for F
where
    F: Fn() -> Box<dyn Generator> + Send + Sync,
{
    fn create(&self, params: &GeneratorParamValues) -> Result<Box<dyn Generator>, Diagnostic> {
        let mut generator = self();
        generator.params_mut().set_all(params)?;
        Ok(generator)
    }
}

/// Name → factory map. Every operation holds the registry lock.
#[derive(Default)]
pub struct GeneratorRegistry {
    factories: Mutex<BTreeMap<String, Box<dyn GeneratorFactory>>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static GeneratorRegistry {
        static REGISTRY: OnceLock<GeneratorRegistry> = OnceLock::new();
        REGISTRY.get_or_init(GeneratorRegistry::new)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Box<dyn GeneratorFactory>>> {
        self.factories.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_factory(
        &self,
        name: &str,
        factory: Box<dyn GeneratorFactory>,
    ) -> Result<(), Diagnostic> {
        if !is_valid_name(name) {
            return Err(user_error(format!("Invalid Generator name: {}", name)));
        }
        let mut factories = self.lock();
        if factories.contains_key(name) {
            return Err(Diagnostic::internal(format!("Duplicate Generator name: {}", name)));
        }
        factories.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn unregister_factory(&self, name: &str) -> Result<(), Diagnostic> {
        match self.lock().remove(name) {
            Some(_) => Ok(()),
            None => Err(Diagnostic::internal(format!("Generator not found: {}", name))),
        }
    }

    pub fn create(
        &self,
        name: &str,
        params: &GeneratorParamValues,
    ) -> Result<Box<dyn Generator>, Diagnostic> {
        let factories = self.lock();
        let factory = factories
            .get(name)
            .ok_or_else(|| user_error(format!("Generator not found: {}", name)))?;
        factory.create(params)
    }

    /// Registered names, sorted.
    pub fn enumerate(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}
