use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::Generator;
use crate::api::{compile_pipeline, CompiledPipeline};
use crate::config::target::Target;
use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Which files `emit_filter` writes, and any extension substitutions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitOptions {
    /// `<base>.stmt`: the aligned statement.
    pub emit_stmt: bool,
    /// `<base>.lowered.stmt`: the statement before alignment.
    pub emit_lowered: bool,
    /// `<base>.align.txt`: per-rule rewrite counts.
    pub emit_report: bool,
    /// `.old -> .new` replacements applied to default extensions.
    pub extensions: BTreeMap<String, String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            emit_stmt: true,
            emit_lowered: false,
            emit_report: false,
            extensions: BTreeMap::new(),
        }
    }
}

impl EmitOptions {
    /// Parse the `-e` and `-x` flag values.
    ///
    /// An empty emit list means the default. Otherwise only the listed
    /// outputs are written; unknown entries are ignored with a warning.
    /// Extension pairs are `.old=.new`, comma separated.
    pub fn parse(emit: &str, extensions: &str) -> Result<Self, Diagnostic> {
        let mut options = if emit.trim().is_empty() {
            Self::default()
        } else {
            let mut options = Self {
                emit_stmt: false,
                ..Self::default()
            };
            for opt in emit.split(',').map(str::trim) {
                match opt {
                    "stmt" => options.emit_stmt = true,
                    "lowered" => options.emit_lowered = true,
                    "report" => options.emit_report = true,
                    "" => {}
                    other => warn!(
                        "Unrecognized emit option: {} not one of [stmt, lowered, report], ignoring.",
                        other
                    ),
                }
            }
            options
        };

        for pair in extensions.split(',').filter(|p| !p.is_empty()) {
            let parts: Vec<&str> = pair.split('=').collect();
            match parts.as_slice() {
                [old, new] if !old.is_empty() && !new.is_empty() => {
                    options.extensions.insert(old.to_string(), new.to_string());
                }
                _ => {
                    return Err(Diagnostic::error(
                        format!("Malformed -x option: {}", pair),
                        Span::dummy(),
                    )
                    .with_help("expected .old=.new[,.old2=.new2]".to_string()));
                }
            }
        }
        Ok(options)
    }

    pub fn extension<'a>(&'a self, default: &'a str) -> &'a str {
        self.extensions.get(default).map_or(default, String::as_str)
    }
}

/// `a::b::name` → `name`.
pub fn simple_name(function_name: &str) -> &str {
    function_name.rsplit("::").next().unwrap_or(function_name)
}

/// Build `generator` for `target`, align it, and write the requested
/// files to `output_dir`. The file stem is `file_base_name`, or the
/// function name without namespaces when that is empty.
pub fn emit_filter(
    generator: &dyn Generator,
    target: &Target,
    output_dir: &Path,
    function_name: &str,
    file_base_name: &str,
    options: &EmitOptions,
) -> Result<Vec<PathBuf>, Diagnostic> {
    let pipeline = generator.build(target)?;
    let compiled = compile_pipeline(&pipeline, target)?;

    let stem = if file_base_name.is_empty() {
        simple_name(function_name)
    } else {
        file_base_name
    };
    let base_path = output_dir.join(stem);
    std::fs::create_dir_all(output_dir).map_err(|e| {
        Diagnostic::error(
            format!("cannot create '{}': {}", output_dir.display(), e),
            Span::dummy(),
        )
    })?;

    let mut written = Vec::new();
    let mut write = |ext: &str, contents: String| -> Result<(), Diagnostic> {
        let path = PathBuf::from(format!(
            "{}{}",
            base_path.display(),
            options.extension(ext)
        ));
        std::fs::write(&path, contents).map_err(|e| {
            Diagnostic::error(
                format!("cannot write '{}': {}", path.display(), e),
                Span::dummy(),
            )
        })?;
        info!("wrote {}", path.display());
        written.push(path);
        Ok(())
    };

    if options.emit_stmt {
        write(".stmt", render_function(&compiled, function_name, true))?;
    }
    if options.emit_lowered {
        write(".lowered.stmt", render_function(&compiled, function_name, false))?;
    }
    if options.emit_report {
        write(
            ".align.txt",
            format!("{} for {}\n{}", function_name, compiled.target, compiled.report),
        )?;
    }
    Ok(written)
}

fn render_function(compiled: &CompiledPipeline, function_name: &str, aligned: bool) -> String {
    let args: Vec<&str> = compiled.arguments.iter().map(|p| p.name()).collect();
    let body = if aligned {
        &compiled.aligned
    } else {
        &compiled.lowered
    };
    format!(
        "// target: {}\nfunc {}({}) {{\n{}}}\n",
        compiled.target,
        function_name,
        args.join(", "),
        body
    )
}
