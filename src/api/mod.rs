//! Compile entry points: pipeline → aligned statement, and the
//! generator-driven build used by the `generate` command.

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, info_span};

use crate::config::target::Target;
use crate::diagnostic::Diagnostic;
use crate::generator::{emit_filter, simple_name, EmitOptions, GeneratorParamValues, GeneratorRegistry, Pipeline};
use crate::ir::align::{align_loads_with_report, AlignReport};
use crate::ir::{Parameter, Stmt};

#[cfg(test)]
mod tests;

/// One pipeline compiled for one target.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledPipeline {
    pub name: String,
    pub target: Target,
    pub arguments: Vec<Parameter>,
    /// The statement as the generator lowered it.
    pub lowered: Stmt,
    /// After vector-load alignment.
    pub aligned: Stmt,
    pub report: AlignReport,
}

/// Run the alignment pass over `pipeline` for `target`.
pub fn compile_pipeline(pipeline: &Pipeline, target: &Target) -> Result<CompiledPipeline, Diagnostic> {
    let _span = info_span!("compile", pipeline = %pipeline.name, target = %target).entered();
    let (aligned, report) = align_loads_with_report(&pipeline.body, target)?;
    debug!(
        "{} rewrites, {} loads unchanged",
        report.rewrites(),
        report.unchanged
    );
    Ok(CompiledPipeline {
        name: pipeline.name.clone(),
        target: target.clone(),
        arguments: pipeline.arguments.clone(),
        lowered: pipeline.body.clone(),
        aligned,
        report,
    })
}

/// Compile `pipeline` for every target concurrently. Results keep the
/// order of `targets`.
pub fn compile_for_targets(
    pipeline: &Pipeline,
    targets: &[Target],
) -> Vec<Result<CompiledPipeline, Diagnostic>> {
    targets
        .par_iter()
        .map(|t| compile_pipeline(pipeline, t))
        .collect()
}

/// Everything the `generate` command needs.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub generator: String,
    /// Defaults to the generator name when empty.
    pub function_name: String,
    /// Defaults to the function name without namespaces when empty.
    pub file_base_name: String,
    pub output_dir: PathBuf,
    /// Generator params, without `target`.
    pub params: GeneratorParamValues,
    pub targets: Vec<Target>,
    pub emit: EmitOptions,
}

/// Create the generator once per target and emit its files.
///
/// With several targets each build runs on its own generator instance
/// and file stems gain a `-<target>` suffix. The first failure is
/// returned; the other targets still run to completion.
pub fn generate(
    registry: &GeneratorRegistry,
    request: &GenerateRequest,
) -> Result<Vec<PathBuf>, Diagnostic> {
    let function_name = if request.function_name.is_empty() {
        request.generator.as_str()
    } else {
        request.function_name.as_str()
    };
    let stem = if request.file_base_name.is_empty() {
        simple_name(function_name)
    } else {
        request.file_base_name.as_str()
    };

    let build = |target: &Target, stem: &str| -> Result<Vec<PathBuf>, Diagnostic> {
        let generator = registry.create(&request.generator, &request.params)?;
        emit_filter(
            generator.as_ref(),
            target,
            &request.output_dir,
            function_name,
            stem,
            &request.emit,
        )
    };

    match request.targets.as_slice() {
        [] => Err(Diagnostic::error(
            "Target missing".to_string(),
            crate::span::Span::dummy(),
        )),
        [target] => build(target, stem),
        targets => {
            let results: Vec<_> = targets
                .par_iter()
                .map(|t| build(t, &format!("{}-{}", stem, t)))
                .collect();
            let mut written = Vec::new();
            for r in results {
                written.extend(r?);
            }
            Ok(written)
        }
    }
}
