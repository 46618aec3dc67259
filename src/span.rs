/// A byte offset range into a configuration source (target.toml).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Span for diagnostics that have no source text behind them
    /// (IR passes, the generator registry, the CLI).
    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// Span covering `line` (without its terminator), where `line` is a
    /// subslice of `source` as produced by `str::lines`.
    pub fn of_line(source: &str, line: &str) -> Self {
        let start = (line.as_ptr() as usize).saturating_sub(source.as_ptr() as usize);
        Self {
            start: start as u32,
            end: (start + line.len()) as u32,
        }
    }
}
