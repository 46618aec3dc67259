use std::path::Path;

use super::*;

// ─── Target descriptor files ───────────────────────────────────────

/// Widest vector register a descriptor may declare.
const MAX_NATURAL_BYTES: i64 = 256;

impl Target {
    /// Load a target descriptor from a TOML file.
    ///
    /// ```toml
    /// [target]
    /// arch = "hexagon"
    /// bits = 32
    /// os = "qurt"
    /// features = ["hvx_128"]
    ///
    /// [vector]
    /// natural_bytes = 128
    /// ```
    ///
    /// Errors carry the span of the offending line; render them against
    /// the file contents.
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read target file '{}': {}", path.display(), e),
                Span::dummy(),
            )
        })?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<Self, Diagnostic> {
        let mut arch: Option<Arch> = None;
        let mut bits: Option<u32> = None;
        let mut os: Option<Os> = None;
        let mut features = BTreeSet::new();
        let mut natural_bytes: Option<i64> = None;

        let mut section = String::new();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let err = |msg: String| Diagnostic::error(msg, Span::of_line(content, line));
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                section = trimmed[1..trimmed.len() - 1].trim().to_string();
                if section != "target" && section != "vector" {
                    return Err(err(format!("unknown section [{}]", section))
                        .with_help("expected [target] or [vector]".to_string()));
                }
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(err(format!("expected 'key = value', found '{}'", trimmed)));
            };
            let key = key.trim();
            let value = value.trim();
            let unquoted = value.trim_matches('"');

            match (section.as_str(), key) {
                ("target", "name") => {}
                ("target", "arch") => {
                    arch = Some(
                        Arch::from_name(unquoted)
                            .ok_or_else(|| err(format!("unknown arch '{}'", unquoted)))?,
                    );
                }
                ("target", "os") => {
                    os = Some(
                        Os::from_name(unquoted)
                            .ok_or_else(|| err(format!("unknown os '{}'", unquoted)))?,
                    );
                }
                ("target", "bits") => match value {
                    "32" => bits = Some(32),
                    "64" => bits = Some(64),
                    _ => return Err(err(format!("invalid target.bits: {}", value))),
                },
                ("target", "features") => {
                    for name in parse_string_array(value) {
                        let f = Feature::from_name(&name)
                            .ok_or_else(|| err(format!("unknown feature '{}'", name)))?;
                        features.insert(f);
                    }
                }
                ("vector", "natural_bytes") => {
                    let n: i64 = value
                        .parse()
                        .map_err(|_| err(format!("invalid vector.natural_bytes: {}", value)))?;
                    if n <= 0 || (n as u64).count_ones() != 1 {
                        return Err(err(format!(
                            "vector.natural_bytes must be a positive power of two, got {}",
                            n
                        )));
                    }
                    if n > MAX_NATURAL_BYTES {
                        return Err(err(format!(
                            "vector.natural_bytes must be at most {}, got {}",
                            MAX_NATURAL_BYTES, n
                        )));
                    }
                    natural_bytes = Some(n);
                }
                _ => {
                    return Err(err(format!("unknown key '{}' in [{}]", key, section)));
                }
            }
        }

        let missing = |what: &str| {
            Diagnostic::error(format!("missing target.{}", what), Span::dummy())
        };
        Ok(Self {
            arch: arch.ok_or_else(|| missing("arch"))?,
            bits: bits.ok_or_else(|| missing("bits"))?,
            os: os.ok_or_else(|| missing("os"))?,
            features,
            natural_bytes,
        })
    }
}

/// Parse `["a", "b"]` into its strings; anything else is empty.
pub fn parse_string_array(s: &str) -> Vec<String> {
    let s = s.trim();
    if !s.starts_with('[') || !s.ends_with(']') {
        return Vec::new();
    }
    let inner = &s[1..s.len() - 1];
    inner
        .split(',')
        .map(|part| part.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
