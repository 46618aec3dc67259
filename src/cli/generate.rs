use std::path::PathBuf;

use clap::Args;

use pixir::api::{generate, GenerateRequest};
use pixir::diagnostic::Diagnostic;
use pixir::generator::{EmitOptions, GeneratorParamValues, GeneratorRegistry};
use pixir::span::Span;

use super::{fail, resolve_targets, target_spec};

#[derive(Args)]
pub struct GenerateArgs {
    /// Generator to run (may be omitted when exactly one is registered)
    #[arg(short = 'g', long = "generator")]
    pub generator: Option<String>,
    /// Function name, optionally namespaced as ns::name (default: generator name)
    #[arg(short = 'f', long = "function")]
    pub function_name: Option<String>,
    /// Output directory
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: PathBuf,
    /// Comma separated files to emit: stmt, lowered, report (default: stmt)
    #[arg(short = 'e', long = "emit", default_value = "")]
    pub emit: String,
    /// Comma separated extension substitutions, .old=.new
    #[arg(short = 'x', long = "extensions", default_value = "")]
    pub extensions: String,
    /// File base name (default: function name without namespaces)
    #[arg(short = 'n', long = "file-base-name")]
    pub file_base_name: Option<String>,
    /// Generator params; target=arch-bits-os[,...] or target=@file.toml is required
    #[arg(value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((k, v)) if !k.is_empty() && !v.is_empty() && !v.contains('=') => {
            Ok((k.to_string(), v.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", arg)),
    }
}

/// `-g` if given; otherwise the only registered generator.
fn pick_generator(explicit: Option<String>, registered: &[String]) -> Result<String, Diagnostic> {
    if let Some(name) = explicit {
        return Ok(name);
    }
    match registered {
        [] => Err(Diagnostic::error(
            "No generators have been registered".to_string(),
            Span::dummy(),
        )),
        [only] => Ok(only.clone()),
        many => Err(Diagnostic::error(
            "-g must be specified if multiple generators are registered".to_string(),
            Span::dummy(),
        )
        .with_note(format!("registered: {}", many.join(", ")))),
    }
}

pub fn cmd_generate(args: GenerateArgs, registry: &GeneratorRegistry) {
    let GenerateArgs {
        generator,
        function_name,
        output_dir,
        emit,
        extensions,
        file_base_name,
        params,
    } = args;

    let mut params: GeneratorParamValues = params.into_iter().collect();
    let explicit_target = params.remove("target");
    let Some(spec) = target_spec(explicit_target.as_deref()) else {
        let err = Diagnostic::error("Target missing".to_string(), Span::dummy())
            .with_help("pass target=arch-bits-os or set PIXIR_TARGET".to_string());
        fail(&err, None)
    };
    let targets = resolve_targets(&spec);

    let generator =
        pick_generator(generator, &registry.enumerate()).unwrap_or_else(|e| fail(&e, None));
    let emit = EmitOptions::parse(&emit, &extensions).unwrap_or_else(|e| fail(&e, None));

    let request = GenerateRequest {
        generator,
        function_name: function_name.unwrap_or_default(),
        file_base_name: file_base_name.unwrap_or_default(),
        output_dir,
        params,
        targets,
        emit,
    };
    match generate(registry, &request) {
        Ok(written) => {
            for path in written {
                eprintln!("Generated -> {}", path.display());
            }
        }
        Err(e) => fail(&e, None),
    }
}
