use std::fmt;

use crate::span::Span;

/// A compiler diagnostic (error, warning, or internal compiler error).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    /// An invariant the compiler itself should have upheld. Aborts the
    /// current pipeline; never retried.
    Internal,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn internal(message: String) -> Self {
        Self {
            severity: Severity::Internal,
            message,
            span: Span::dummy(),
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_internal(&self) -> bool {
        self.severity == Severity::Internal
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Internal => ReportKind::Custom("internal error", Color::Magenta),
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
            Severity::Internal => Color::Magenta,
        };

        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.start as usize..self.span.end as usize))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        let _ = report.finish().eprint((filename, Source::from(source)));
    }

    /// Print a diagnostic that has no source text behind it.
    pub fn print(&self) {
        eprintln!("{}", self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Internal => "internal error",
        };
        write!(f, "{}: {}", label, self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {}", note)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {}", help)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(10, 15);
        let d = Diagnostic::error("unknown feature".to_string(), span);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "unknown feature");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_internal_construction() {
        let d = Diagnostic::internal("Unknown HVX mode".to_string());
        assert!(d.is_internal());
        assert!(d.span.is_dummy());
        assert_eq!(d.to_string(), "internal error: Unknown HVX mode");
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::warning("ignored emit option".to_string(), Span::dummy())
            .with_note("note 1".to_string())
            .with_help("use one of stmt, lowered, report".to_string())
            .with_note("note 2".to_string());
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.notes.len(), 2);
        assert_eq!(
            d.to_string(),
            "warning: ignored emit option\n  note: note 1\n  note: note 2\n  help: use one of stmt, lowered, report"
        );
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "[target]\narch = \"sparc\"\n";
        let d = Diagnostic::error("unknown arch 'sparc'".to_string(), Span::new(9, 23))
            .with_help("expected x86, arm, hexagon or wasm".to_string());
        d.render("target.toml", source);
    }
}
