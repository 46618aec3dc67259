pub mod generate;
pub mod list;

use std::process;

use pixir::config::target::{Target, TARGET_ENV_VAR};
use pixir::diagnostic::Diagnostic;

/// Print `err`, rendering it against the target file when it came from
/// one, and exit with status 1.
pub fn fail(err: &Diagnostic, target_spec: Option<&str>) -> ! {
    let file = target_spec
        .and_then(|s| s.strip_prefix('@'))
        .filter(|_| !err.span.is_dummy());
    match file.and_then(|path| std::fs::read_to_string(path).ok().map(|src| (path, src))) {
        Some((path, source)) => err.render(path, &source),
        None => err.print(),
    }
    process::exit(1);
}

/// Resolve a comma-separated list of targets. Each entry is a target
/// string or `@path` to a target file.
pub fn resolve_targets(spec: &str) -> Vec<Target> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Target::resolve(s).unwrap_or_else(|e| fail(&e, Some(s))))
        .collect()
}

/// `target=` from the params, else `PIXIR_TARGET`.
pub fn target_spec(explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(TARGET_ENV_VAR).ok())
        .filter(|s| !s.trim().is_empty())
}
