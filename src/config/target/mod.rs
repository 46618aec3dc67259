use std::collections::BTreeSet;
use std::fmt;

use crate::diagnostic::Diagnostic;
use crate::ir::{DeviceApi, Type};
use crate::span::Span;

/// Environment variable consulted by [`Target::from_env`].
pub const TARGET_ENV_VAR: &str = "PIXIR_TARGET";

/// Instruction set family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    Arm,
    /// Hexagon DSP; vector width comes from the HVX mode.
    Hexagon,
    Wasm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Osx,
    Windows,
    Android,
    Qurt,
    NoOs,
}

/// Optional target capabilities. The closed set the compiler understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    Sse41,
    Avx,
    Avx2,
    Avx512,
    /// Hexagon vector extensions, 64-byte mode.
    Hvx64,
    /// Hexagon vector extensions, 128-byte mode.
    Hvx128,
    Debug,
    NoAsserts,
    NoBoundsQuery,
}

const ARCH_NAMES: &[(&str, Arch)] = &[
    ("x86", Arch::X86),
    ("arm", Arch::Arm),
    ("hexagon", Arch::Hexagon),
    ("wasm", Arch::Wasm),
];

const OS_NAMES: &[(&str, Os)] = &[
    ("linux", Os::Linux),
    ("osx", Os::Osx),
    ("windows", Os::Windows),
    ("android", Os::Android),
    ("qurt", Os::Qurt),
    ("noos", Os::NoOs),
];

const FEATURE_NAMES: &[(&str, Feature)] = &[
    ("sse41", Feature::Sse41),
    ("avx", Feature::Avx),
    ("avx2", Feature::Avx2),
    ("avx512", Feature::Avx512),
    ("hvx_64", Feature::Hvx64),
    ("hvx_128", Feature::Hvx128),
    ("debug", Feature::Debug),
    ("no_asserts", Feature::NoAsserts),
    ("no_bounds_query", Feature::NoBoundsQuery),
];

fn lookup<T: Copy>(table: &[(&str, T)], name: &str) -> Option<T> {
    table.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

fn name_of<T: PartialEq>(table: &'static [(&'static str, T)], value: &T) -> &'static str {
    table
        .iter()
        .find(|(_, v)| v == value)
        .map(|(n, _)| *n)
        .unwrap_or("?")
}

impl Arch {
    pub fn from_name(name: &str) -> Option<Self> {
        lookup(ARCH_NAMES, name)
    }

    pub fn name(&self) -> &'static str {
        name_of(ARCH_NAMES, self)
    }
}

impl Os {
    pub fn from_name(name: &str) -> Option<Self> {
        lookup(OS_NAMES, name)
    }

    pub fn name(&self) -> &'static str {
        name_of(OS_NAMES, self)
    }
}

impl Feature {
    pub fn from_name(name: &str) -> Option<Self> {
        lookup(FEATURE_NAMES, name)
    }

    pub fn name(&self) -> &'static str {
        name_of(FEATURE_NAMES, self)
    }
}

/// The machine a pipeline is compiled for.
///
/// Decides what "natural alignment" means for vector loads: the native
/// vector register width in bytes, and the fixed widths of coprocessor
/// loops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub arch: Arch,
    pub bits: u32,
    pub os: Os,
    features: BTreeSet<Feature>,
    /// Set by target files that pin the vector width explicitly.
    natural_bytes: Option<i64>,
}

impl Target {
    pub fn new(arch: Arch, bits: u32, os: Os) -> Self {
        Self {
            arch,
            bits,
            os,
            features: BTreeSet::new(),
            natural_bytes: None,
        }
    }

    /// The machine running the compiler.
    pub fn host() -> Self {
        let (arch, bits) = if cfg!(target_arch = "x86_64") {
            (Arch::X86, 64)
        } else if cfg!(target_arch = "x86") {
            (Arch::X86, 32)
        } else if cfg!(target_arch = "aarch64") {
            (Arch::Arm, 64)
        } else if cfg!(target_arch = "arm") {
            (Arch::Arm, 32)
        } else if cfg!(target_arch = "wasm32") {
            (Arch::Wasm, 32)
        } else {
            (Arch::X86, 64)
        };
        let os = if cfg!(target_os = "macos") {
            Os::Osx
        } else if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "android") {
            Os::Android
        } else {
            Os::Linux
        };
        Self::new(arch, bits, os)
    }

    /// Target named by `PIXIR_TARGET`, or the host when unset.
    pub fn from_env() -> Result<Self, Diagnostic> {
        match std::env::var(TARGET_ENV_VAR) {
            Ok(s) if !s.trim().is_empty() => Self::parse(s.trim()),
            _ => Ok(Self::host()),
        }
    }

    /// Parse `arch-bits-os[-feature...]`. Tokens may appear in any order;
    /// `host` starts from the compiling machine and later tokens override.
    pub fn parse(s: &str) -> Result<Self, Diagnostic> {
        let mut target = Self::host();
        let (mut arch, mut bits, mut os) = (false, false, false);
        for (i, token) in s.split('-').enumerate() {
            if i == 0 && token == "host" {
                arch = true;
                bits = true;
                os = true;
            } else if let Some(a) = Arch::from_name(token) {
                target.arch = a;
                arch = true;
            } else if let Some(o) = Os::from_name(token) {
                target.os = o;
                os = true;
            } else if token == "32" || token == "64" {
                target.bits = if token == "32" { 32 } else { 64 };
                bits = true;
            } else if let Some(f) = Feature::from_name(token) {
                target.features.insert(f);
            } else {
                return Err(Diagnostic::error(
                    format!("unknown token '{}' in target string '{}'", token, s),
                    Span::dummy(),
                )
                .with_help(format!(
                    "target strings look like arch-bits-os[-feature...]; features: {}",
                    FEATURE_NAMES
                        .iter()
                        .map(|(n, _)| *n)
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }
        if !(arch && bits && os) {
            return Err(Diagnostic::error(
                format!("target string '{}' must name an arch, bit width and os", s),
                Span::dummy(),
            )
            .with_help("e.g. x86-64-linux-avx2, hexagon-32-qurt-hvx_128, or host".to_string()));
        }
        Ok(target)
    }

    /// Accepts `@path/to/target.toml` or a target string.
    pub fn resolve(spec: &str) -> Result<Self, Diagnostic> {
        match spec.strip_prefix('@') {
            Some(path) => Self::load(std::path::Path::new(path)),
            None => Self::parse(spec),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_natural_bytes(mut self, bytes: i64) -> Self {
        self.natural_bytes = Some(bytes);
        self
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.set_feature(feature);
        self
    }

    pub fn set_feature(&mut self, feature: Feature) {
        self.features.insert(feature);
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn features_any_of(&self, features: &[Feature]) -> bool {
        features.iter().any(|f| self.has_feature(*f))
    }

    /// Width of a native vector register in bytes.
    pub fn natural_vector_bytes(&self) -> i64 {
        if let Some(bytes) = self.natural_bytes {
            return bytes;
        }
        if self.has_feature(Feature::Hvx128) {
            128
        } else if self.features_any_of(&[Feature::Hvx64, Feature::Avx512]) {
            64
        } else if self.features_any_of(&[Feature::Avx, Feature::Avx2]) {
            32
        } else {
            16
        }
    }

    /// Number of `ty` elements in a native vector.
    pub fn natural_vector_size(&self, ty: Type) -> i64 {
        self.natural_vector_bytes() / ty.bytes()
    }

    /// Fixed vector width of loops offloaded to `device`, if it has one.
    ///
    /// Hexagon loops run in the target's HVX mode; a Hexagon loop on a
    /// target with no HVX mode is an internal error.
    pub fn device_vector_bytes(&self, device: DeviceApi) -> Result<Option<i64>, Diagnostic> {
        match device {
            DeviceApi::Hexagon => {
                if self.has_feature(Feature::Hvx128) {
                    Ok(Some(128))
                } else if self.has_feature(Feature::Hvx64) {
                    Ok(Some(64))
                } else {
                    Err(Diagnostic::internal("Unknown HVX mode".to_string())
                        .with_note(format!("target '{}' enables neither hvx_64 nor hvx_128", self)))
                }
            }
            DeviceApi::Host | DeviceApi::Gpu => Ok(None),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.arch.name(), self.bits, self.os.name())?;
        for feature in &self.features {
            write!(f, "-{}", feature.name())?;
        }
        Ok(())
    }
}

mod file;
pub use file::parse_string_array;

#[cfg(test)]
mod tests;
